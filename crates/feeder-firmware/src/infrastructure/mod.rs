pub(crate) mod adapters;
pub(crate) mod drivers;
pub(crate) mod tasks;
