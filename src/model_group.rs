//! Model groups (pt. 1, §3.8).

use crate::particle::Particle;
use crate::xstypes::Sequence;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Compositor {
    All,
    Choice,
    Sequence,
}

/// Schema Component: Model Group (pt. 1, §3.8)
#[derive(Clone, Debug, PartialEq)]
pub struct ModelGroup {
    pub compositor: Compositor,
    pub particles: Sequence<Particle>,
}
