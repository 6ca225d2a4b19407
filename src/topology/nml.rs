use std::str::FromStr;

use nsi_aura_codec::VlanRanges;
use nsi_aura_codec::xml::{XmlDict, parse_dict};

/// One `BidirectionalPort` resolved into the shape the reconciler needs.
/// Pure data — no database, no network.
#[derive(Debug, Clone, PartialEq)]
pub struct StpRecord {
    pub stp_id: String,
    pub inbound_port: Option<String>,
    pub outbound_port: Option<String>,
    pub inbound_alias: Option<String>,
    pub outbound_alias: Option<String>,
    pub vlan_range: VlanRanges,
    pub description: Option<String>,
}

fn attr_or_child_text(dict: &XmlDict, key: &str) -> Option<String> {
    dict.get_str(key)
        .ok()
        .or_else(|| dict.child(key).ok().and_then(|d| d.text().ok()))
        .map(str::to_string)
}

fn find_relation<'a>(port: &'a XmlDict, relation_type: &str) -> Option<&'a XmlDict> {
    port.children("Relation")
        .into_iter()
        .find(|r| r.get_str("type") == Ok(relation_type))
}

/// Resolve one directional member (`hasInboundPort` / `hasOutboundPort`) to
/// its port id, VLAN label, and alias target, if any.
struct Member {
    port_id: String,
    vlan_range: Option<VlanRanges>,
    alias: Option<String>,
}

fn resolve_member(port: &XmlDict, relation_type: &str) -> Option<Member> {
    let relation = find_relation(port, relation_type)?;
    let group = relation.child("PortGroup").ok()?;
    let port_id = attr_or_child_text(group, "id")?;

    let vlan_range = group
        .child("LabelGroup")
        .ok()
        .and_then(|l| l.text().ok())
        .and_then(|text| VlanRanges::from_str(text).ok());

    let alias = find_relation(group, "isAlias")
        .and_then(|r| r.child("PortGroup").ok())
        .and_then(|g| attr_or_child_text(g, "id"));

    Some(Member {
        port_id,
        vlan_range,
        alias,
    })
}

/// Parse every `BidirectionalPort` in a topology document into an
/// [`StpRecord`]. A malformed individual port is warned about and skipped
/// rather than failing the whole document (best-effort per element); the
/// caller already treats a whole-document parse failure as aborting just
/// that document, per the pipeline's failure policy.
pub fn parse_stp_records(xml: &str) -> nsi_aura_codec::Result<Vec<StpRecord>> {
    let dict = parse_dict(xml)?;
    let topology = dict.child("Topology").or_else(|_| dict.child("topology"))?;

    let mut records = Vec::new();
    for port in topology.children("BidirectionalPort") {
        let Some(stp_id) = attr_or_child_text(port, "id") else {
            log::warn!("BidirectionalPort missing id, skipping");
            continue;
        };

        let inbound = resolve_member(port, "hasInboundPort");
        let outbound = resolve_member(port, "hasOutboundPort");

        if inbound.is_none() && outbound.is_none() {
            log::warn!("BidirectionalPort {stp_id} has no resolvable in/out member, skipping");
            continue;
        }

        let vlan_range = match (&inbound, &outbound) {
            (Some(i), Some(o)) => {
                match (&i.vlan_range, &o.vlan_range) {
                    (Some(iv), Some(ov)) if iv != ov => {
                        log::warn!(
                            "BidirectionalPort {stp_id} has asymmetric LabelGroups between in/out members"
                        );
                    }
                    _ => {}
                }
                i.vlan_range.clone().unwrap_or_default()
            }
            (Some(i), None) => i.vlan_range.clone().unwrap_or_default(),
            (None, Some(o)) => o.vlan_range.clone().unwrap_or_default(),
            (None, None) => unreachable!("checked above"),
        };

        records.push(StpRecord {
            stp_id,
            inbound_port: inbound.as_ref().map(|m| m.port_id.clone()),
            outbound_port: outbound.as_ref().map(|m| m.port_id.clone()),
            inbound_alias: inbound.as_ref().and_then(|m| m.alias.clone()),
            outbound_alias: outbound.as_ref().and_then(|m| m.alias.clone()),
            vlan_range,
            description: attr_or_child_text(port, "name"),
        });
    }

    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn port(relations: &str) -> String {
        format!(
            r#"<Topology><BidirectionalPort id="a.example:2024:p1" name="port one">{relations}</BidirectionalPort></Topology>"#
        )
    }

    #[test]
    fn single_relation_and_relation_list_both_yield_an_stp() {
        let single = port(
            r#"<Relation type="hasInboundPort"><PortGroup id="a.example:2024:p1:in"><LabelGroup>100-200</LabelGroup></PortGroup></Relation>"#,
        );
        let list = port(
            r#"<Relation type="hasInboundPort"><PortGroup id="a.example:2024:p1:in"><LabelGroup>100-200</LabelGroup></PortGroup></Relation><Relation type="hasOutboundPort"><PortGroup id="a.example:2024:p1:out"><LabelGroup>100-200</LabelGroup></PortGroup></Relation>"#,
        );

        assert_eq!(parse_stp_records(&single).unwrap().len(), 1);
        assert_eq!(parse_stp_records(&list).unwrap().len(), 1);
    }

    #[test]
    fn resolves_alias_for_sdp_detection() {
        let xml = port(
            r#"<Relation type="hasInboundPort"><PortGroup id="a.example:2024:p1:in"><LabelGroup>100-200</LabelGroup><Relation type="isAlias"><PortGroup id="z.example:2024:p1:out"/></Relation></PortGroup></Relation>"#,
        );
        let records = parse_stp_records(&xml).unwrap();
        assert_eq!(
            records[0].inbound_alias.as_deref(),
            Some("z.example:2024:p1:out")
        );
    }

    #[test]
    fn missing_id_is_skipped_not_fatal() {
        let xml = r#"<Topology><BidirectionalPort><Relation type="hasInboundPort"><PortGroup id="x:in"/></Relation></BidirectionalPort></Topology>"#;
        assert_eq!(parse_stp_records(xml).unwrap().len(), 0);
    }
}
