//! Raw values that flow between ports.
//!
//! `Value` is the closed set of representations a port can hold. Which of
//! them a port accepts is decided by its [`DataType`](super::DataType).

use image::RgbaImage;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

/// A reference-counted image, either decoded or still on its way.
///
/// Cloning is cheap: decoded pixels are shared, never copied.
#[derive(Clone)]
pub enum ImageHandle {
    /// Decode has not finished yet.
    Pending,
    /// Fully decoded RGBA pixels.
    Loaded(Arc<RgbaImage>),
}

impl ImageHandle {
    /// Wrap an already decoded buffer.
    pub fn from_rgba(image: RgbaImage) -> Self {
        ImageHandle::Loaded(Arc::new(image))
    }

    /// Decode an in-memory PNG or JPEG.
    pub fn decode(bytes: &[u8]) -> Result<Self, image::ImageError> {
        let img = image::load_from_memory(bytes)?;
        Ok(Self::from_rgba(img.to_rgba8()))
    }

    /// Decode an image file from disk.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, image::ImageError> {
        let img = image::open(path)?;
        Ok(Self::from_rgba(img.to_rgba8()))
    }

    /// `true` once pixels are available and the image has a non-zero height.
    pub fn is_complete(&self) -> bool {
        match self {
            ImageHandle::Pending => false,
            ImageHandle::Loaded(img) => img.height() > 0,
        }
    }

    pub fn pixels(&self) -> Option<&Arc<RgbaImage>> {
        match self {
            ImageHandle::Pending => None,
            ImageHandle::Loaded(img) => Some(img),
        }
    }

    pub fn dimensions(&self) -> Option<(u32, u32)> {
        self.pixels().map(|img| img.dimensions())
    }
}

impl PartialEq for ImageHandle {
    /// Two handles are equal when they share the same pixel buffer.
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (ImageHandle::Pending, ImageHandle::Pending) => true,
            (ImageHandle::Loaded(a), ImageHandle::Loaded(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Debug for ImageHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImageHandle::Pending => write!(f, "ImageHandle(pending)"),
            ImageHandle::Loaded(img) => {
                write!(f, "ImageHandle({}x{})", img.width(), img.height())
            }
        }
    }
}

/// A raw value as stored in, or offered to, a port.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Number(f64),
    Text(String),
    Image(ImageHandle),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_image(&self) -> Option<&ImageHandle> {
        match self {
            Value::Image(handle) => Some(handle),
            _ => None,
        }
    }

    /// Decoded pixels, if this value is a loaded image.
    pub fn as_pixels(&self) -> Option<&Arc<RgbaImage>> {
        self.as_image().and_then(ImageHandle::pixels)
    }

    /// Variant name, for log lines and error messages.
    pub fn variant_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Number(_) => "number",
            Value::Text(_) => "text",
            Value::Image(_) => "image",
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Number(n) => write!(f, "{}", n),
            Value::Text(s) => write!(f, "{:?}", s),
            Value::Image(ImageHandle::Pending) => write!(f, "Image (loading)"),
            Value::Image(ImageHandle::Loaded(img)) => {
                write!(f, "Image ({} x {})", img.width(), img.height())
            }
        }
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<ImageHandle> for Value {
    fn from(handle: ImageHandle) -> Self {
        Value::Image(handle)
    }
}

impl From<RgbaImage> for Value {
    fn from(img: RgbaImage) -> Self {
        Value::Image(ImageHandle::from_rgba(img))
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(opt: Option<T>) -> Self {
        opt.map(Into::into).unwrap_or(Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_handle_completeness() {
        assert!(!ImageHandle::Pending.is_complete());
        assert!(!ImageHandle::from_rgba(RgbaImage::new(4, 0)).is_complete());
        assert!(ImageHandle::from_rgba(RgbaImage::new(4, 2)).is_complete());
    }

    #[test]
    fn test_image_handle_equality_is_by_buffer() {
        let a = ImageHandle::from_rgba(RgbaImage::new(2, 2));
        let b = a.clone();
        let c = ImageHandle::from_rgba(RgbaImage::new(2, 2));
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(ImageHandle::decode(b"not an image").is_err());
    }

    #[test]
    fn test_display() {
        assert_eq!(Value::Number(7.0).to_string(), "7");
        assert_eq!(Value::Null.to_string(), "null");
        let img: Value = RgbaImage::new(3, 5).into();
        assert_eq!(img.to_string(), "Image (3 x 5)");
    }

    #[test]
    fn test_from_option() {
        let none: Option<f64> = None;
        assert_eq!(Value::from(none), Value::Null);
        assert_eq!(Value::from(Some(2.5)), Value::Number(2.5));
    }
}
