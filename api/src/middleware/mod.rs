mod cloudfront;
mod signature;

pub use cloudfront::cloudfront_middleware;
pub use signature::signature_middleware;
