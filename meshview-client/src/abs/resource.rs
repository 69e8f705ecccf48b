//! The lifecycle contract shared by every GPU resource.

use std::rc::Rc;

use super::context::GlContext;
use super::error::GlError;

/// A value that exclusively owns one or more GPU objects.
///
/// The default value is empty. `init` on a live resource releases the old
/// objects first, `delete` is a no-op on an empty resource, and dropping a
/// resource deletes it. Moving a resource out with [`std::mem::take`] leaves
/// an empty one behind.
pub trait GpuResource: Default {
    /// What the resource is created from.
    type Data<'a>;
    /// Where the resource is bound for use.
    type Slot;

    /// Allocates the resource from `data`.
    fn init(&mut self, gl: &Rc<GlContext>, data: Self::Data<'_>) -> Result<(), GlError>;

    /// Replaces the contents in place.
    ///
    /// Fails with [`GlError::Incompatible`] when `data` would change the
    /// shape (size, format, count) of the resource; the caller then deletes
    /// and reinitializes.
    fn update(&mut self, data: Self::Data<'_>) -> Result<(), GlError>;

    fn bind(&self, slot: Self::Slot) -> Result<(), GlError>;

    fn delete(&mut self);

    fn is_allocated(&self) -> bool;
}

/// The context a resource was created with, or `Unallocated`.
pub(crate) fn context<'a>(
    gl: &'a Option<Rc<GlContext>>,
    what: &'static str,
) -> Result<&'a Rc<GlContext>, GlError> {
    gl.as_ref().ok_or(GlError::Unallocated(what))
}
