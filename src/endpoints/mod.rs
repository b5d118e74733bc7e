pub mod index_resource;
pub mod rate_resource;
pub mod recommend_resource;
