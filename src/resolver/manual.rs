use crate::context::ReleaseContext;
use crate::domain::{increment, PreReleaseSpec, ReleaseType};
use crate::error::{KiaraError, Result};
use crate::resolver::Resolution;
use crate::ui::{Choice, Prompt};
use semver::Version;

/// Release types offered for `current`.
///
/// Stable increments always; `prerelease` first when the current version is
/// a pre-release; the `pre*` family when a pre-release flow was requested.
pub fn release_type_choices(current: &Version, wants_pre_release: bool) -> Vec<ReleaseType> {
    let mut types = Vec::new();
    if !current.pre.is_empty() {
        types.push(ReleaseType::Prerelease);
    }
    types.extend(ReleaseType::STABLE);
    if wants_pre_release {
        types.extend(ReleaseType::PRE);
    }
    types
}

fn build_choices(
    current: &Version,
    types: &[ReleaseType],
    pre: &PreReleaseSpec,
) -> Result<Vec<Choice>> {
    types
        .iter()
        .map(|release_type| {
            let next = increment(current, *release_type, pre)?;
            let label = format!("{} ({})", release_type, next);
            Ok(Choice::new(label, release_type.as_str()).with_hint(next.to_string()))
        })
        .collect()
}

/// Apply `--release-type` directly, otherwise ask the operator.
///
/// Cancelling the prompt fails the run.
pub fn resolve(ctx: &ReleaseContext, prompt: &dyn Prompt) -> Result<Resolution> {
    let pre = ctx.options.pre_release();

    let release_type = match ctx.options.release_type {
        Some(release_type) => release_type,
        None if ctx.options.ci => {
            return Err(KiaraError::validation(
                "The manual bump strategy needs --release-type when running with --ci",
            ))
        }
        None => {
            let types = release_type_choices(&ctx.current_version, ctx.options.wants_pre_release());
            let choices = build_choices(&ctx.current_version, &types, &pre)?;
            prompt.select("Select version bump", &choices)?.parse()?
        }
    };

    let version = increment(&ctx.current_version, release_type, &pre)?;
    Ok(Resolution {
        version,
        release_type,
        reason: None,
        warnings: Vec::new(),
    })
}
