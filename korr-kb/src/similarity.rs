use ipnetwork::Ipv4Network;
use std::net::Ipv4Addr;

enum Predicate<'a> {
    Call { name: &'a str, args: Vec<&'a str> },
    Atom(&'a str),
}

fn parse(s: &str) -> Predicate<'_> {
    if let Some(open) = s.find('(') {
        if s.ends_with(')') {
            let name = &s[..open];
            let args_str = &s[open + 1..s.len() - 1];
            let args = if args_str.trim().is_empty() {
                Vec::new()
            } else {
                args_str.split(',').map(|a| a.trim()).collect()
            };
            return Predicate::Call { name, args };
        }
    }
    Predicate::Atom(s)
}

fn args_match(x: &str, y: &str) -> bool {
    if x == y {
        return true;
    }
    if matches!(x, "+ANY_ADDR+" | "+ANY_PORT+") || matches!(y, "+ANY_ADDR+" | "+ANY_PORT+") {
        return true;
    }
    cidr_contains(x, y) || cidr_contains(y, x)
}

fn cidr_contains(cidr_side: &str, ip_side: &str) -> bool {
    match (cidr_side.parse::<Ipv4Network>(), ip_side.parse::<Ipv4Addr>()) {
        (Ok(net), Ok(ip)) => net.contains(ip),
        _ => false,
    }
}

/// Two predicates match if textually equal, or both parse as `fn(args…)`
/// with the same name and arity and each argument pair matches under
/// spec.md §4.6's three rules (equal, wildcard macro, CIDR containment).
pub fn predicates_match(a: &str, b: &str) -> bool {
    if a == b {
        return true;
    }
    match (parse(a), parse(b)) {
        (Predicate::Call { name: n1, args: a1 }, Predicate::Call { name: n2, args: a2 }) => {
            n1 == n2 && a1.len() == a2.len() && a1.iter().zip(a2.iter()).all(|(x, y)| args_match(x, y))
        }
        _ => false,
    }
}

/// `I / U` where `I` counts each matching `(post(A), pre(B))` pair twice
/// and `U = |post(A)| + |pre(B)|`; 0 when `U == 0`.
pub fn similarity(post_a: &[String], pre_b: &[String]) -> f64 {
    let mut matches = 0usize;
    for post in post_a {
        for pre in pre_b {
            if predicates_match(post, pre) {
                matches += 1;
            }
        }
    }

    let u = post_a.len() + pre_b.len();
    if u == 0 {
        0.0
    } else {
        (2 * matches) as f64 / u as f64
    }
}
