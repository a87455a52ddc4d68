mod handler;

pub use handler::AuthScoringService;
