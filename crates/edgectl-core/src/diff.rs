use crate::CoreError;
use edgectl_remote::EdgeApi;
use edgectl_schema::ServiceId;
use similar::TextDiff;
use tracing::debug;

const CONTEXT_LINES: usize = 3;

/// Compares versions of a service using the remote's rendered configuration.
pub struct DiffEngine<'a> {
    api: &'a dyn EdgeApi,
}

impl<'a> DiffEngine<'a> {
    pub fn new(api: &'a dyn EdgeApi) -> Self {
        Self { api }
    }

    /// Unified diff of the rendered text of `from` against `to`, with
    /// `--- version <from>` / `+++ version <to>` headers. Empty when the
    /// renderings are identical.
    pub fn unified_diff(
        &self,
        service: &ServiceId,
        from: u32,
        to: u32,
    ) -> Result<String, CoreError> {
        let old = self.api.rendered_text(service, from)?;
        let new = self.api.rendered_text(service, to)?;
        debug!(
            "diffing {service} version {from} ({} bytes) against {to} ({} bytes)",
            old.len(),
            new.len()
        );
        Ok(unified(&old, &new, from, to))
    }

    /// True when the remote's rendering of `from` against itself is
    /// byte-identical to its rendering of `from` against `to`.
    ///
    /// The remote renderer is not stable under no-op edits, so this compares
    /// two remote outputs rather than the versions' contents.
    pub fn versions_equal(
        &self,
        service: &ServiceId,
        from: u32,
        to: u32,
    ) -> Result<bool, CoreError> {
        let baseline = self.api.rendered_text(service, from)?;
        let cross = self.api.get_diff(service, from, to)?;
        Ok(baseline == cross)
    }
}

pub fn unified(old: &str, new: &str, from: u32, to: u32) -> String {
    TextDiff::from_lines(old, new)
        .unified_diff()
        .context_radius(CONTEXT_LINES)
        .header(&format!("version {from}"), &format!("version {to}"))
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use edgectl_remote::mock::MockApi;

    fn api() -> MockApi {
        let api = MockApi::new();
        api.add_service("SVC1", "edge-1", 6, Some(5));
        api
    }

    fn svc() -> ServiceId {
        ServiceId::new("SVC1")
    }

    #[test]
    fn identical_texts_give_empty_diff() {
        assert_eq!(unified("a\nb\n", "a\nb\n", 1, 2), "");
    }

    #[test]
    fn diff_has_version_headers() {
        let diff = unified("a\nb\n", "a\nc\n", 5, 6);
        assert!(diff.starts_with("--- version 5\n+++ version 6\n"));
        assert!(diff.contains("\n-b\n"));
        assert!(diff.contains("\n+c\n"));
    }

    #[test]
    fn context_is_three_lines() {
        let old: String = (1..=10).map(|n| format!("line {n}\n")).collect();
        let new = old.replace("line 5\n", "line five\n");
        let diff = unified(&old, &new, 1, 2);
        assert!(diff.contains("@@ -2,7 +2,7 @@"));
        assert!(!diff.contains("line 1\n"));
    }

    #[test]
    fn unified_diff_uses_self_renderings() {
        let api = api();
        api.set_rendered("SVC1", 5, "backend a\n");
        api.set_rendered("SVC1", 6, "backend b\n");
        let diff = DiffEngine::new(&api).unified_diff(&svc(), 5, 6).unwrap();
        assert!(diff.contains("-backend a"));
        assert!(diff.contains("+backend b"));
        assert!(api
            .calls()
            .iter()
            .all(|c| c == "get_diff SVC1 5 5" || c == "get_diff SVC1 6 6"));
    }

    #[test]
    fn version_equals_itself() {
        let api = api();
        api.set_rendered("SVC1", 3, "anything at all\n");
        assert!(DiffEngine::new(&api).versions_equal(&svc(), 3, 3).unwrap());
    }

    #[test]
    fn cross_diff_matching_baseline_is_equal() {
        let api = api();
        api.set_rendered("SVC1", 5, "backend origin\n");
        api.set_diff("SVC1", 5, 6, "backend origin\n");
        assert!(DiffEngine::new(&api).versions_equal(&svc(), 5, 6).unwrap());
    }

    #[test]
    fn cross_diff_differing_is_not_equal() {
        let api = api();
        api.set_rendered("SVC1", 5, "backend a\n");
        api.set_rendered("SVC1", 6, "backend b\n");
        assert!(!DiffEngine::new(&api).versions_equal(&svc(), 5, 6).unwrap());
    }

    #[test]
    fn fetch_failure_propagates() {
        let api = api();
        api.fail_on("get_diff");
        assert!(matches!(
            DiffEngine::new(&api).unified_diff(&svc(), 5, 6),
            Err(CoreError::Remote(_))
        ));
    }
}
