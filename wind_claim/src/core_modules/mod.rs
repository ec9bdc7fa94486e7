pub mod area;
pub mod cluster;
pub mod damage_label;
pub mod fingerprint;
pub mod gray_frame;
pub mod image_record;
pub mod quality;
pub mod utils;
