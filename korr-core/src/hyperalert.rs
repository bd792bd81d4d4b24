/// An alert's pre/post-condition predicates after macro expansion
/// (spec.md §4.6). Attached once, by the knowledge-base index, on first
/// binding of an alert instance; never mutated afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct HyperAlertBinding {
    pub pre: Vec<String>,
    pub post: Vec<String>,
}

impl HyperAlertBinding {
    pub fn is_empty(&self) -> bool {
        self.pre.is_empty() && self.post.is_empty()
    }
}
