pub mod decoder_factory;
pub mod ffmpeg_decoder;
pub mod ffmpeg_writer;
pub mod queued_video_writer;
pub mod test_pattern_decoder;
