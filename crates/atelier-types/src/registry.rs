//! Registry trait for self-registering implementations.

/// Trait implemented by every pluggable backend registry.
///
/// Each implementation module (storage backends, directory providers)
/// exposes a registry naming itself and handing out its factory, so the
/// builder can discover implementations by the name used in configuration.
pub trait ImplementationRegistry {
	/// The name this implementation registers under
	const NAME: &'static str;

	/// The factory type for this implementation
	type Factory;

	/// Get the factory function for this implementation
	fn factory() -> Self::Factory;
}
