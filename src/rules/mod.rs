//! Concrete languages built on the grammar engine.

pub(crate) mod arithmetic;
