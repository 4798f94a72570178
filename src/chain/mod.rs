pub mod chain;
pub mod node;

#[cfg(test)]
pub(crate) mod testing;
