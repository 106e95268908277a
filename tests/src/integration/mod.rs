//! Cross-crate integration scenarios.

#[cfg(test)]
mod fixtures;
#[cfg(test)]
mod identity;
#[cfg(test)]
mod network;
#[cfg(test)]
mod sessions;
