pub mod image_crate_encoder;
