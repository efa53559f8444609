pub mod contact;
pub mod error;
pub mod form;
pub mod health;
pub mod image;
pub mod state;
pub mod transcription;
pub mod validation;
pub mod video;

use actix_web::web::ServiceConfig;

/// Every route served by the proxy
pub fn routes(cfg: &mut ServiceConfig) {
    cfg.app_data(validation::json_config())
        .configure(health::health_config)
        .configure(image::image_config)
        .configure(video::video_config)
        .configure(transcription::transcription_config)
        .configure(contact::contact_config);
}
