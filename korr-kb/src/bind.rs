use crate::rule::Rule;
use korr_core::{Alert, HyperAlertBinding};

/// Strip whitespace then expand the six header macros (spec.md §4.6)
/// against one alert's concrete field values.
fn expand(template: &str, src_addr: &str, dst_addr: &str, src_port: &str, dst_port: &str) -> String {
    template
        .trim()
        .replace("+SRC_ADDR+", src_addr)
        .replace("+DST_ADDR+", dst_addr)
        .replace("+SRC_PORT+", src_port)
        .replace("+DST_PORT+", dst_port)
        .replace("+ANY_ADDR+", "0.0.0.0")
        .replace("+ANY_PORT+", "0")
}

pub fn bind(rule: &Rule, alert: &Alert) -> HyperAlertBinding {
    let src_addr = alert.ip.src.to_string();
    let dst_addr = alert.ip.dst.to_string();
    let src_port = alert.src_port().map(|p| p.to_string()).unwrap_or_else(|| "0".to_string());
    let dst_port = alert.dst_port().map(|p| p.to_string()).unwrap_or_else(|| "0".to_string());

    HyperAlertBinding {
        pre: rule
            .pre
            .iter()
            .map(|p| expand(p, &src_addr, &dst_addr, &src_port, &dst_port))
            .collect(),
        post: rule
            .post
            .iter()
            .map(|p| expand(p, &src_addr, &dst_addr, &src_port, &dst_port))
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use korr_core::headers::{Ipv4Header, Transport, TcpFlags, TcpHeader, PROTO_TCP};
    use korr_core::key::AlertTypeKey;
    use std::net::Ipv4Addr;

    #[test]
    fn expands_addr_and_port_macros_from_alert_fields() {
        let rule = Rule {
            desc: "probe".to_string(),
            pre: vec!["scan(+SRC_ADDR+,+DST_PORT+)".to_string()],
            post: vec!["+ANY_ADDR+ +ANY_PORT+".to_string()],
        };

        let alert = Alert::new(
            AlertTypeKey::new(1, 1000, 1),
            3,
            0,
            Ipv4Header {
                tos: 0,
                total_length: 40,
                id: 1,
                ttl: 64,
                protocol: PROTO_TCP,
                src: Ipv4Addr::new(10, 0, 0, 1),
                dst: Ipv4Addr::new(10, 0, 0, 2),
            },
            Transport::Tcp(TcpHeader {
                src_port: 4444,
                dst_port: 80,
                seq: 0,
                ack: 0,
                flags: TcpFlags(0),
                window: 0,
                length: 0,
            }),
        );

        let binding = bind(&rule, &alert);
        assert_eq!(binding.pre, vec!["scan(10.0.0.1,80)"]);
        assert_eq!(binding.post, vec!["0.0.0.0 0"]);
    }
}
