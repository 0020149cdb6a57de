pub mod accumulator;
pub mod controller;
pub mod etl;
pub mod extractor;
pub mod locator;
pub mod normalizer;
pub mod pipeline;
pub mod transformer;

pub use crate::domain::model::{Dataset, Record};
pub use crate::domain::ports::{ConfigProvider, DocumentFetcher, Pipeline, Storage};
pub use crate::utils::error::Result;
