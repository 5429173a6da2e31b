//! Utility macros for reducing boilerplate

/// Implement `FromRef<AppState>` for a state field.
///
/// # Example
/// ```ignore
/// impl_from_ref!(Arc<ApiConfig>, config);
/// // Expands to:
/// impl axum::extract::FromRef<AppState> for Arc<ApiConfig> {
///     fn from_ref(state: &AppState) -> Self {
///         state.config.clone()
///     }
/// }
/// ```
#[macro_export]
macro_rules! impl_from_ref {
    ($type:ty, $field:ident) => {
        impl axum::extract::FromRef<$crate::state::AppState> for $type {
            fn from_ref(state: &$crate::state::AppState) -> Self {
                state.$field.clone()
            }
        }
    };
}
