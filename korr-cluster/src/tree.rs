use korr_core::NodeId;

#[derive(Debug, Clone)]
struct NodeRecord {
    range: (u64, u64),
    label: Option<String>,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    synthetic: bool,
}

/// One generalization tree over a numeric namespace (a port space or the
/// IPv4 address space). Arena-indexed: nodes live in a flat `Vec` and
/// refer to each other by `u32` id rather than `Rc<RefCell<_>>`, so the
/// tree can grow synthetic leaves at generalization time without any
/// interior mutability ceremony.
#[derive(Debug, Clone)]
pub struct HierarchyTree {
    nodes: Vec<NodeRecord>,
}

pub const ROOT: NodeId = 0;

fn contains(range: (u64, u64), value: u64) -> bool {
    range.0 <= value && value <= range.1
}

fn strictly_contains(cover: (u64, u64), child: (u64, u64)) -> bool {
    cover.0 <= child.0 && cover.1 >= child.1 && cover != child
}

fn slack(cover: (u64, u64), child: (u64, u64)) -> u64 {
    (child.0 - cover.0) + (cover.1 - child.1)
}

fn width(range: (u64, u64)) -> u64 {
    range.1 - range.0
}

impl HierarchyTree {
    /// Build a tree for `namespace` from declared `(label, range)` nodes,
    /// attaching each under the smallest other node that strictly
    /// contains it, ties broken by slack then declaration order, falling
    /// back to the namespace root (spec.md §4.4).
    pub fn build(namespace: (u64, u64), declared: &[(String, (u64, u64))]) -> Self {
        let mut nodes = vec![NodeRecord {
            range: namespace,
            label: None,
            parent: None,
            children: Vec::new(),
            synthetic: false,
        }];

        for (label, range) in declared {
            nodes.push(NodeRecord {
                range: *range,
                label: Some(label.clone()),
                parent: None,
                children: Vec::new(),
                synthetic: false,
            });
        }

        for idx in 1..nodes.len() {
            let child_range = nodes[idx].range;
            let mut best: Option<(usize, u64, u64)> = None; // (cover_id, width, slack)

            for cand in 0..nodes.len() {
                if cand == idx {
                    continue;
                }
                let cover_range = nodes[cand].range;
                if !strictly_contains(cover_range, child_range) {
                    continue;
                }
                let w = width(cover_range);
                let s = slack(cover_range, child_range);
                let better = match &best {
                    None => true,
                    Some((best_id, best_w, best_s)) => {
                        (w, s, cand) < (*best_w, *best_s, *best_id)
                    }
                };
                if better {
                    best = Some((cand, w, s));
                }
            }

            let parent = best.map(|(id, _, _)| id as NodeId).unwrap_or(ROOT);
            nodes[idx].parent = Some(parent);
            nodes[parent as usize].children.push(idx as NodeId);
        }

        Self { nodes }
    }

    pub fn range(&self, id: NodeId) -> (u64, u64) {
        self.nodes[id as usize].range
    }

    pub fn is_point(&self, id: NodeId) -> bool {
        let r = self.nodes[id as usize].range;
        r.0 == r.1
    }

    pub fn label(&self, id: NodeId) -> Option<&str> {
        self.nodes[id as usize].label.as_deref()
    }

    /// Descend the tree for `value`, returning the deepest matching node.
    /// If that node's range is a point, return it; otherwise insert (or
    /// reuse) a synthetic leaf holding the exact value. `None` if `value`
    /// falls outside the namespace entirely.
    pub fn generalize(&mut self, value: u64) -> Option<NodeId> {
        if !contains(self.nodes[ROOT as usize].range, value) {
            return None;
        }

        let mut current = ROOT;
        loop {
            let next = self.nodes[current as usize]
                .children
                .iter()
                .copied()
                .find(|&c| contains(self.nodes[c as usize].range, value));
            match next {
                Some(c) => current = c,
                None => break,
            }
        }

        if self.is_point(current) {
            return Some(current);
        }

        if let Some(existing) = self.nodes[current as usize]
            .children
            .iter()
            .copied()
            .find(|&c| self.nodes[c as usize].synthetic && self.nodes[c as usize].range == (value, value))
        {
            return Some(existing);
        }

        let new_id = self.nodes.len() as NodeId;
        self.nodes.push(NodeRecord {
            range: (value, value),
            label: None,
            parent: Some(current),
            children: Vec::new(),
            synthetic: true,
        });
        self.nodes[current as usize].children.push(new_id);
        Some(new_id)
    }
}
