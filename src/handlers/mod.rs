//! Handler modules for the browser automation tools
//!
//! Each module contains the tools for one category:
//! - `navigation`: loading URLs and waiting for the network to settle
//! - `elements`: element interaction (click, fill)
//! - `page`: page-level operations (screenshot, evaluate, get_content)

pub mod elements;
pub mod navigation;
pub mod page;
