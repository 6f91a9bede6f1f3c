//! Identifier renames admitted by the naming policy

use std::collections::BTreeSet;

use canonize_syntax::visit::names_in_body;
use canonize_syntax::{bound_names, module_globals, FunctionDef};

use crate::context::ExplainContext;
use crate::difference::{DifferenceType, PropertyDifference, RenamePair, TransformationHints};

/// Positional correspondence of parameters, then of other local bindings
fn aligned_names(ours: &FunctionDef, theirs: &FunctionDef) -> Vec<(String, String)> {
    let mut pairs = Vec::new();
    let our_params: Vec<&str> = ours.param_names().collect();
    let their_params: Vec<&str> = theirs.param_names().collect();
    if our_params.len() == their_params.len() {
        pairs.extend(
            our_params
                .iter()
                .zip(&their_params)
                .map(|(a, b)| ((*a).to_string(), (*b).to_string())),
        );
    }
    let locals = |def: &FunctionDef, params: &[&str]| -> Vec<String> {
        bound_names(&def.body, false)
            .into_iter()
            .filter(|n| !params.contains(&n.as_str()))
            .collect()
    };
    let our_locals = locals(ours, &our_params);
    let their_locals = locals(theirs, &their_params);
    if our_locals.len() == their_locals.len() {
        pairs.extend(our_locals.into_iter().zip(their_locals));
    }
    pairs
}

/// Renames carrying the candidate entry's identifiers onto the canon's
pub(super) fn naming_difference(ctx: &ExplainContext<'_>) -> Option<PropertyDifference> {
    let policy = ctx.naming?;
    if !policy.allows_renaming() {
        return None;
    }
    let ours = ctx.candidate.entry(ctx.entry_point)?;
    let theirs = ctx.canon.entry(ctx.entry_point)?;

    let mut taken: BTreeSet<String> = names_in_body(&ours.body);
    taken.extend(ours.param_names().map(str::to_string));
    taken.extend(bound_names(&ours.body, true));
    taken.extend(module_globals(ctx.candidate.module));

    let mut targets = BTreeSet::new();
    let renames: Vec<RenamePair> = aligned_names(ours, theirs)
        .into_iter()
        .filter(|(from, to)| {
            policy.can_rename(from, to) && !taken.contains(to) && targets.insert(to.clone())
        })
        .map(|(from, to)| RenamePair::new(from, to))
        .collect();
    if renames.is_empty() {
        return None;
    }

    let listed = renames
        .iter()
        .map(|r| format!("{} -> {}", r.from, r.to))
        .collect::<Vec<_>>()
        .join(", ");
    Some(
        PropertyDifference::new(
            DifferenceType::IdentifierNaming,
            TransformationHints::Rename {
                function: ours.name.clone(),
                renames,
            },
        )
        .with_explanation(format!("candidate names differ from canon: {listed}"))
        .with_details(
            ours.param_names().collect::<Vec<_>>().join(", "),
            theirs.param_names().collect::<Vec<_>>().join(", "),
        ),
    )
}
