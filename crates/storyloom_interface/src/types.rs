//! Request option types.

use serde::{Deserialize, Serialize};

/// Options passed to an [`ImageGenerator`](crate::ImageGenerator).
///
/// # Examples
///
/// ```
/// use storyloom_interface::ImageOptions;
///
/// let options = ImageOptions::builder()
///     .size("512x512")
///     .style(Some("ink wash".to_string()))
///     .build()
///     .unwrap();
/// assert_eq!(options.size(), "512x512");
/// ```
#[derive(
    Debug,
    Clone,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    derive_getters::Getters,
    derive_builder::Builder,
)]
#[builder(setter(into))]
pub struct ImageOptions {
    /// Requested dimensions, e.g. `1024x1024`
    size: String,
    /// Illustration style
    #[builder(default)]
    style: Option<String>,
}

impl ImageOptions {
    /// Creates a new builder.
    pub fn builder() -> ImageOptionsBuilder {
        ImageOptionsBuilder::default()
    }

    /// Options with a size and optional style.
    pub fn new(size: impl Into<String>, style: Option<String>) -> Self {
        Self {
            size: size.into(),
            style,
        }
    }
}
