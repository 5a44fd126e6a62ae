use super::{AssembledSchema, DescriptorSet};
use crate::error::{Error, Result};
use fuzzy_matcher::skim::SkimMatcherV2;
use fuzzy_matcher::FuzzyMatcher;
use std::collections::HashMap;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Visit {
    Unseen,
    InProgress,
    Done,
}

/// Build self-contained schema units from a decoded set.
///
/// With no targets every file is its own root, in blob order. Otherwise each
/// target name is mapped to the first file declaring it and files requested
/// more than once are assembled once.
pub fn assemble<'a>(
    set: &'a DescriptorSet,
    targets: &[String],
) -> Result<Vec<AssembledSchema<'a>>> {
    let index: HashMap<&str, usize> = set
        .files()
        .iter()
        .enumerate()
        .map(|(i, f)| (f.name(), i))
        .collect();

    let roots: Vec<usize> = if targets.is_empty() {
        (0..set.len()).collect()
    } else {
        let mut roots = Vec::new();
        for target in targets {
            let owner = set
                .owner_of(target)
                .ok_or_else(|| Error::NotFound {
                    kind: "element",
                    name: target.clone(),
                    suggestion: suggest(set, target),
                })?;
            let i = index[owner.name()];
            if !roots.contains(&i) {
                roots.push(i);
            }
        }
        roots
    };

    roots
        .into_iter()
        .map(|root| {
            let schema = closure(set, &index, root)?;
            debug!(
                root = schema.root.name(),
                files = schema.files.len(),
                "assembled dependency closure"
            );
            Ok(schema)
        })
        .collect()
}

fn closure<'a>(
    set: &'a DescriptorSet,
    index: &HashMap<&str, usize>,
    root: usize,
) -> Result<AssembledSchema<'a>> {
    let files = set.files();
    let mut state = vec![Visit::Unseen; files.len()];
    let mut path = Vec::new();
    visit(set, index, root, &mut state, &mut path)?;

    // Stable topological order: among files whose dependencies are all placed,
    // the one earliest in the blob goes next.
    let mut pending: Vec<usize> = (0..files.len())
        .filter(|&i| state[i] == Visit::Done)
        .collect();
    let mut placed = vec![false; files.len()];
    let mut ordered = Vec::with_capacity(pending.len());
    while !pending.is_empty() {
        let next = pending
            .iter()
            .position(|&i| {
                files[i]
                    .dependencies()
                    .iter()
                    .all(|dep| index.get(dep.as_str()).is_some_and(|&j| placed[j]))
            })
            .ok_or_else(|| Error::CyclicDependency {
                cycle: pending.iter().map(|&i| files[i].name().to_string()).collect(),
            })?;
        let i = pending.remove(next);
        placed[i] = true;
        ordered.push(&files[i]);
    }

    Ok(AssembledSchema {
        root: &files[root],
        files: ordered,
    })
}

fn visit(
    set: &DescriptorSet,
    index: &HashMap<&str, usize>,
    current: usize,
    state: &mut [Visit],
    path: &mut Vec<usize>,
) -> Result<()> {
    match state[current] {
        Visit::Done => return Ok(()),
        Visit::InProgress => {
            let start = path.iter().position(|&i| i == current).unwrap_or(0);
            let mut cycle: Vec<String> = path[start..]
                .iter()
                .map(|&i| set.files()[i].name().to_string())
                .collect();
            cycle.push(set.files()[current].name().to_string());
            return Err(Error::CyclicDependency { cycle });
        }
        Visit::Unseen => {}
    }

    state[current] = Visit::InProgress;
    path.push(current);
    let file = &set.files()[current];
    for dep in file.dependencies() {
        let next = *index.get(dep.as_str()).ok_or_else(|| Error::NotFound {
            kind: "dependency",
            name: format!("{dep} (imported by {})", file.name()),
            suggestion: None,
        })?;
        visit(set, index, next, state, path)?;
    }
    path.pop();
    state[current] = Visit::Done;
    Ok(())
}

fn suggest(set: &DescriptorSet, target: &str) -> Option<String> {
    let matcher = SkimMatcherV2::default();
    let mut best: Option<(i64, &str)> = None;
    for candidate in set.declared_names() {
        if let Some(score) = matcher.fuzzy_match(candidate, target) {
            if best.map_or(true, |(s, _)| score > s) {
                best = Some((score, candidate));
            }
        }
    }
    best.map(|(_, name)| name.to_string())
}
