//! Read model trait for query-side views.

/// A queryable view maintained by a projection.
pub trait ReadModel: Send + Sync {
    /// Returns the name of this read model.
    fn name(&self) -> &'static str;

    /// Returns the number of entries, or 0 while a writer holds the view.
    fn count(&self) -> usize;
}
