#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct LayerId(pub u64);

/// A drawable overlay derived from the current snapshot.
pub trait Layer {
    fn id(&self) -> LayerId;

    fn name(&self) -> &'static str;
}
