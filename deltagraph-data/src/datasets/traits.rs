use deltagraph_core::GraphError;

/// Indexed access to training rows.
///
/// For training a network, an item is one row: one tensor per network input.
pub trait Dataset: Send + Sync {
    type Item: Send + 'static;

    /// Returns the item at `index`.
    ///
    /// # Errors
    ///
    /// Returns `GraphError::IndexOutOfBounds` if `index >= len()`.
    fn get(&self, index: usize) -> Result<Self::Item, GraphError>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
