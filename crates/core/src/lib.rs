//! Playback, frame capture and re-encoding pipeline.
//!
//! The crate is split into bounded contexts, each with a `domain` layer
//! (traits and value types) and an `infrastructure` layer backed by the
//! external media frameworks (FFmpeg, `image`).

pub mod shared {
    pub mod clock;
    pub mod config;
    pub mod constants;
    pub mod error;
    pub mod frame;
    pub mod frame_slot;
    pub mod media_locator;
    pub mod video_metadata;
}

pub mod video {
    pub mod domain {
        pub mod video_decoder;
        pub mod video_writer;
    }
    pub mod infrastructure;
}

pub mod playback {
    pub mod domain {
        pub mod event_sink;
        pub mod media_engine;
        pub mod playback_session;
        pub mod player_event;
        pub mod player_state;
    }
    pub mod infrastructure;
    pub mod playback_controller;
    pub mod time_source;
}

pub mod capture {
    pub mod domain {
        pub mod still_image_encoder;
    }
    pub mod frame_capture_service;
    pub mod infrastructure;
}

pub mod recording {
    pub mod domain {
        pub mod recording_state;
    }
    pub mod recording_engine;
}
