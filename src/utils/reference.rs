// Payment reference helpers
// References look like `<plan_type>-<number>`, e.g. `weekly-483920117`

use rand::Rng;

/// New checkout reference for `plan_type`
pub fn generate_reference(plan_type: &str) -> String {
    let suffix: u32 = rand::thread_rng().gen_range(0..1_000_000_000);
    format!("{}-{}", plan_type, suffix)
}

/// Plan type encoded in a reference: everything before the last `-`
pub fn plan_type_from_reference(reference: &str) -> Option<&str> {
    reference
        .rsplit_once('-')
        .map(|(plan, _)| plan)
        .filter(|plan| !plan.is_empty())
}
