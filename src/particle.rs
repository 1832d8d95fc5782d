//! Particles and occurrence-range arithmetic (pt. 1, §3.9).

use crate::element_decl::ElementDeclaration;
use crate::model_group::ModelGroup;
use crate::wildcard::Wildcard;

/// Schema Component: Particle (pt. 1, §3.9)
#[derive(Clone, Debug, PartialEq)]
pub struct Particle {
    pub min_occurs: u32,
    pub max_occurs: MaxOccurs,
    pub term: Term,
}

/// The `{max occurs}` property: a non-negative integer or `unbounded`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum MaxOccurs {
    Unbounded,
    Bounded(u32),
}

/// The `{term}` property of a particle (pt. 1, §3.9.1)
#[derive(Clone, Debug, PartialEq)]
pub enum Term {
    ElementDeclaration(Box<ElementDeclaration>),
    ModelGroup(Box<ModelGroup>),
    Wildcard(Wildcard),
}

/// Result of [`Particle::effective_total_range`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct OccurrenceRange {
    pub minimum: u32,
    pub maximum: MaxOccurs,
}

impl MaxOccurs {
    pub fn is_unbounded(self) -> bool {
        matches!(self, MaxOccurs::Unbounded)
    }

    /// Saturating addition: any unbounded operand makes the sum unbounded.
    pub fn add(self, other: MaxOccurs) -> MaxOccurs {
        match (self, other) {
            (MaxOccurs::Bounded(a), MaxOccurs::Bounded(b)) => MaxOccurs::Bounded(a.saturating_add(b)),
            _ => MaxOccurs::Unbounded,
        }
    }

    /// Saturating multiplication. Zero absorbs unbounded: a particle that
    /// may not occur contributes nothing no matter how large its term is.
    pub fn mul(self, other: MaxOccurs) -> MaxOccurs {
        match (self, other) {
            (MaxOccurs::Bounded(0), _) | (_, MaxOccurs::Bounded(0)) => MaxOccurs::Bounded(0),
            (MaxOccurs::Bounded(a), MaxOccurs::Bounded(b)) => MaxOccurs::Bounded(a.saturating_mul(b)),
            _ => MaxOccurs::Unbounded,
        }
    }

    pub fn max(self, other: MaxOccurs) -> MaxOccurs {
        match (self, other) {
            (MaxOccurs::Bounded(a), MaxOccurs::Bounded(b)) => MaxOccurs::Bounded(a.max(b)),
            _ => MaxOccurs::Unbounded,
        }
    }
}

impl Particle {
    /// Effective Total Range (pt. 1, §3.8.6.5 and §3.8.6.6)
    ///
    /// For a model-group term, `all` and `sequence` sum their particles'
    /// ranges while `choice` takes the minimum of the minimums and the
    /// maximum of the maximums; either way the result is scaled by this
    /// particle's own occurrence range. For an element or wildcard term
    /// the range is just the particle's own.
    pub fn effective_total_range(&self) -> OccurrenceRange {
        let group = match &self.term {
            Term::ModelGroup(group) => group,
            Term::ElementDeclaration(_) | Term::Wildcard(_) => {
                return OccurrenceRange {
                    minimum: self.min_occurs,
                    maximum: self.max_occurs,
                }
            }
        };

        if group.particles.is_empty() {
            return OccurrenceRange {
                minimum: 0,
                maximum: MaxOccurs::Bounded(0),
            };
        }

        let child_ranges: Vec<OccurrenceRange> = group
            .particles
            .iter()
            .map(|particle| match &particle.term {
                Term::ModelGroup(_) => particle.effective_total_range(),
                Term::ElementDeclaration(_) | Term::Wildcard(_) => OccurrenceRange {
                    minimum: particle.min_occurs,
                    maximum: particle.max_occurs,
                },
            })
            .collect();

        use crate::model_group::Compositor;
        let (minimum, maximum) = match group.compositor {
            Compositor::All | Compositor::Sequence => (
                child_ranges
                    .iter()
                    .fold(0u32, |acc, r| acc.saturating_add(r.minimum)),
                child_ranges
                    .iter()
                    .fold(MaxOccurs::Bounded(0), |acc, r| acc.add(r.maximum)),
            ),
            Compositor::Choice => (
                child_ranges.iter().map(|r| r.minimum).min().unwrap_or(0),
                child_ranges
                    .iter()
                    .fold(MaxOccurs::Bounded(0), |acc, r| acc.max(r.maximum)),
            ),
        };

        OccurrenceRange {
            minimum: self.min_occurs.saturating_mul(minimum),
            maximum: self.max_occurs.mul(maximum),
        }
    }

    /// Particle Emptiable (pt. 1, §3.9.6.3)
    pub fn is_emptiable(&self) -> bool {
        self.min_occurs == 0
            || (matches!(self.term, Term::ModelGroup(_))
                && self.effective_total_range().minimum == 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model_group::{Compositor, ModelGroup};
    use crate::wildcard::{NamespaceConstraint, ProcessContents, Wildcard};

    fn wildcard_particle(min_occurs: u32, max_occurs: MaxOccurs) -> Particle {
        Particle {
            min_occurs,
            max_occurs,
            term: Term::Wildcard(Wildcard {
                namespace_constraint: NamespaceConstraint::any(),
                process_contents: ProcessContents::Lax,
            }),
        }
    }

    fn group_particle(compositor: Compositor, particles: Vec<Particle>) -> Particle {
        Particle {
            min_occurs: 1,
            max_occurs: MaxOccurs::Bounded(1),
            term: Term::ModelGroup(Box::new(ModelGroup {
                compositor,
                particles,
            })),
        }
    }

    #[test]
    fn empty_group_has_zero_range() {
        let particle = group_particle(Compositor::Sequence, Vec::new());
        assert_eq!(
            particle.effective_total_range(),
            OccurrenceRange {
                minimum: 0,
                maximum: MaxOccurs::Bounded(0),
            }
        );
        assert!(particle.is_emptiable());
    }

    #[test]
    fn sequence_sums_child_ranges() {
        let particle = group_particle(
            Compositor::Sequence,
            vec![
                wildcard_particle(1, MaxOccurs::Bounded(1)),
                wildcard_particle(0, MaxOccurs::Unbounded),
            ],
        );
        assert_eq!(
            particle.effective_total_range(),
            OccurrenceRange {
                minimum: 1,
                maximum: MaxOccurs::Unbounded,
            }
        );
    }

    #[test]
    fn choice_takes_extremes_of_child_ranges() {
        let particle = group_particle(
            Compositor::Choice,
            vec![
                wildcard_particle(1, MaxOccurs::Bounded(1)),
                wildcard_particle(2, MaxOccurs::Bounded(3)),
            ],
        );
        assert_eq!(
            particle.effective_total_range(),
            OccurrenceRange {
                minimum: 1,
                maximum: MaxOccurs::Bounded(3),
            }
        );
    }

    #[test]
    fn occurrence_arithmetic_saturates_instead_of_overflowing() {
        let mut particle = group_particle(
            Compositor::Sequence,
            vec![
                wildcard_particle(u32::MAX, MaxOccurs::Bounded(u32::MAX)),
                wildcard_particle(u32::MAX, MaxOccurs::Bounded(u32::MAX)),
            ],
        );
        particle.min_occurs = u32::MAX;
        particle.max_occurs = MaxOccurs::Bounded(u32::MAX);
        assert_eq!(
            particle.effective_total_range(),
            OccurrenceRange {
                minimum: u32::MAX,
                maximum: MaxOccurs::Bounded(u32::MAX),
            }
        );
    }

    #[test]
    fn zero_max_occurs_absorbs_unbounded_children() {
        let mut particle = group_particle(
            Compositor::Sequence,
            vec![wildcard_particle(0, MaxOccurs::Unbounded)],
        );
        particle.min_occurs = 0;
        particle.max_occurs = MaxOccurs::Bounded(0);
        assert_eq!(
            particle.effective_total_range().maximum,
            MaxOccurs::Bounded(0)
        );
    }
}
