//! A rust library for repartitioning collections of N-dimensional images into blocks.
//!
//! An image collection holds one [`ndarray::ArrayD`] per image, where every image has the same [`Dimensions`](dimensions::Dimensions) and element type.
//! Large collections are easier to store and process as blocks: every block stacks one spatial tile of every image along a new leading axis.
//!
//! Blocks are sized either by a target average block size in bytes (e.g. `"150M"`) or by an explicit number of splits per axis.
//! When an axis does not divide evenly, the leading blocks along that axis are one element larger.
//! Blocks can overlap their neighbours by a padding halo, which is clamped at the image boundary.
//!
//! Blocks are enumerated in storage order, where the first axis of a [`SpatialKey`](keys::SpatialKey) varies fastest.
//! Within a block, images are stacked in ascending image key order.
//!
//! ## Getting Started
//! - [`images::Images`] holds an image collection. [`images::Images::to_blocks`] and [`images::Images::to_series`] are good places to start.
//! - [`images::Images::gaussian_filter`] and [`images::Images::median_filter`] smooth images before they are split into padded blocks.
//! - [`strategy::BlockingStrategy`] and [`pipeline::assemble`] give full control over how blocks are assembled.
//! - [`config::global_config_mut`] changes defaults such as the block size warning threshold.
//!
//! ## Example
//! ```rust
//! use ndarray::array;
//! use voxblocks::images::Images;
//!
//! let mut images: Images<u64, f64> = Images::new(vec![
//!     (0, array![[0.0, 1.0], [2.0, 3.0]].into_dyn()),
//!     (1, array![[4.0, 5.0], [6.0, 7.0]].into_dyn()),
//! ]);
//! let blocks = images.to_blocks([2, 1], 0usize)?;
//! assert_eq!(blocks.len(), 2);
//! let block = blocks.iter().next().unwrap();
//! assert_eq!(block.data(), &array![[[0.0, 1.0]], [[4.0, 5.0]]].into_dyn());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Logging
//! `voxblocks` logs with [`tracing`].
//! Geometry decisions and stage sizes are logged at the debug level.
//! An oversized average block is logged as a warning.
//! No subscriber is installed by the library.
//!
//! ## Licence
//! `voxblocks` is licensed under either of
//!  - the Apache License, Version 2.0 <http://www.apache.org/licenses/LICENSE-2.0> or
//!  - the MIT license <http://opensource.org/licenses/MIT>, at your option.

#![warn(unused_variables)]
#![warn(dead_code)]
#![deny(missing_docs)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![deny(clippy::missing_panics_doc)]

pub mod array;
pub mod array_subset;
pub mod block_size;
pub mod blocks;
pub mod collection;
pub mod config;
pub mod data_type;
pub mod dimensions;
pub mod errors;
pub mod filters;
pub mod geometry;
pub mod images;
pub mod keys;
pub mod pipeline;
pub mod strategy;

pub use block_size::{BlockSizeSpec, Padding};
pub use blocks::{Block, Blocks, Series};
pub use errors::BlockingError;
pub use images::Images;
pub use pipeline::{assemble, AssembleOptions};
pub use strategy::BlockingStrategy;
