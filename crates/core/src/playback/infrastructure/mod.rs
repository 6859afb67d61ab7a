pub mod channel_event_sink;
pub mod decoding_engine;
pub mod player_factory;
pub mod playhead;
