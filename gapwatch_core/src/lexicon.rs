use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::table::{resolve_by_tags, Attribute, OutcomeSet, Street, Tag, TagSet};

// ---------------------------------------------------------------------
// Curated attribute combinations
// ---------------------------------------------------------------------

/// Single axes tracked on their own. Streets are only tracked in pairs.
pub const SINGLE_AXES: &[Attribute] = &[
    Attribute::Color,
    Attribute::Parity,
    Attribute::Range,
    Attribute::Dozen,
    Attribute::Column,
];

pub const PAIR_AXES: &[[Attribute; 2]] = &[
    [Attribute::Color, Attribute::Parity],
    [Attribute::Color, Attribute::Dozen],
    [Attribute::Color, Attribute::Column],
    [Attribute::Parity, Attribute::Dozen],
    [Attribute::Parity, Attribute::Column],
    [Attribute::Range, Attribute::Column],
    [Attribute::Color, Attribute::Street],
    [Attribute::Parity, Attribute::Street],
];

/// Three-axis "pinpoint" combinations.
pub const TRIPLE_AXES: &[[Attribute; 3]] = &[
    [Attribute::Color, Attribute::Parity, Attribute::Column],
    [Attribute::Color, Attribute::Parity, Attribute::Dozen],
    [Attribute::Color, Attribute::Parity, Attribute::Range],
    [Attribute::Parity, Attribute::Range, Attribute::Column],
];

/// A named, tag-derived group of outcomes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityDefinition {
    pub id: String,
    pub name: String,
    pub tags: TagSet,
    pub numbers: OutcomeSet,
    /// Member count; lower means more pinpointed.
    pub score: usize,
}

/// Values the lexicon enumerates for an axis. Streets skip the zero pocket.
fn lexicon_values(attr: Attribute) -> Vec<Tag> {
    let mut values = attr.values();
    if attr == Attribute::Street {
        values.retain(|t| *t != Tag::Street(Street::Zero));
    }
    values
}

/// Cartesian product of the axes' values, first axis outermost.
fn combinations(axes: &[Attribute]) -> Vec<TagSet> {
    axes.iter().fold(vec![TagSet::default()], |acc, &attr| {
        let values = lexicon_values(attr);
        acc.into_iter()
            .flat_map(|base| values.iter().map(move |&t| base.with(t)))
            .collect()
    })
}

/// Resolve a tag set into an entity. `None` when nothing satisfies it.
pub fn create_entity(tags: TagSet) -> Option<EntityDefinition> {
    let numbers = resolve_by_tags(&tags);
    if numbers.is_empty() {
        return None;
    }

    let specified = tags.tags();
    let name = specified
        .iter()
        .map(|t| t.label())
        .collect::<Vec<_>>()
        .join(" ");
    let id = specified
        .iter()
        .map(|t| t.slug())
        .collect::<Vec<_>>()
        .join("+");

    Some(EntityDefinition {
        id,
        name,
        tags,
        numbers,
        score: numbers.len(),
    })
}

/// Build the full entity catalog: singles, then pairs, then triples, each in
/// curated order. Pure; the same tables always yield the same list.
pub fn generate_lexicon() -> Vec<EntityDefinition> {
    let groups = SINGLE_AXES
        .iter()
        .map(std::slice::from_ref)
        .chain(PAIR_AXES.iter().map(|p| p.as_slice()))
        .chain(TRIPLE_AXES.iter().map(|t| t.as_slice()));

    let mut entities = Vec::new();
    let mut discarded = 0usize;
    for axes in groups {
        for tags in combinations(axes) {
            match create_entity(tags) {
                Some(e) => entities.push(e),
                None => discarded += 1,
            }
        }
    }

    debug!(entities = entities.len(), discarded, "entity lexicon generated");
    entities
}
