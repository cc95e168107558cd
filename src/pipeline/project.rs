//! Projection of the full document structure onto the procurement record.

use crate::document::FullDocumentStructure;
use crate::output::{ExtractedData, OrderLineCreate};

/// Currency assumed when the document does not state one.
pub const DEFAULT_CURRENCY: &str = "EUR";

fn non_empty(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Map a validated [`FullDocumentStructure`] to [`ExtractedData`].
///
/// The VAT ID is copied as the oracle reported it; the confidence stage
/// decides whether it survives. `confidence` starts as the oracle's own
/// value and `commodity_group` as unset.
pub fn project(structure: &FullDocumentStructure) -> ExtractedData {
    let vendor = structure.vendor.as_ref();
    let requestor = structure.requestor.as_ref();

    ExtractedData {
        vendor_name: vendor.map(|v| v.name.trim().to_string()).unwrap_or_default(),
        vat_id: vendor.and_then(|v| non_empty(&v.vat_id)),
        requestor_name: requestor.and_then(|r| {
            non_empty(&r.contact_person)
                .or_else(|| Some(r.name.trim().to_string()).filter(|n| !n.is_empty()))
        }),
        requestor_department: requestor.and_then(|r| non_empty(&r.department)),
        title: non_empty(&structure.document.title),
        order_lines: structure
            .order_lines
            .iter()
            .map(|line| OrderLineCreate {
                position_description: line.description.trim().to_string(),
                unit_price: line.unit_price,
                amount: line.quantity,
                unit: line.unit.trim().to_string(),
                total_price: line.total_price,
            })
            .collect(),
        total_cost: structure.totals.total_cost().unwrap_or_default(),
        currency: non_empty(&structure.currency)
            .map(|c| c.to_ascii_uppercase())
            .unwrap_or_else(|| DEFAULT_CURRENCY.to_string()),
        confidence: structure.confidence,
        commodity_group: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{CompanyEntity, DocumentInfo, EntityRole, OrderLineDetailed, Totals};

    fn entity(name: &str, role: EntityRole) -> CompanyEntity {
        CompanyEntity {
            name: name.into(),
            vat_id: None,
            address: None,
            contact_person: None,
            department: None,
            role,
        }
    }

    fn structure() -> FullDocumentStructure {
        FullDocumentStructure {
            document: DocumentInfo {
                title: Some("Moos-Wand".into()),
                ..DocumentInfo::default()
            },
            vendor: Some(CompanyEntity {
                vat_id: Some("DE198570491".into()),
                ..entity("Gärtner Gregg GmbH", EntityRole::Vendor)
            }),
            requestor: Some(CompanyEntity {
                contact_person: Some("Max Mustermann".into()),
                department: Some("Marketing".into()),
                ..entity("Lio Technologies GmbH", EntityRole::Requestor)
            }),
            order_lines: vec![OrderLineDetailed {
                description: "Moos-Wand".into(),
                unit_price: 1438.0,
                quantity: 1.0,
                unit: "Stk".into(),
                total_price: 1438.0,
            }],
            currency: None,
            totals: Totals {
                net: Some(1438.0),
                tax: None,
                gross: None,
            },
            confidence: 0.9,
        }
    }

    #[test]
    fn requestor_prefers_contact_person() {
        let data = project(&structure());
        assert_eq!(data.requestor_name.as_deref(), Some("Max Mustermann"));
        assert_eq!(data.requestor_department.as_deref(), Some("Marketing"));
    }

    #[test]
    fn requestor_falls_back_to_entity_name() {
        let mut s = structure();
        s.requestor.as_mut().unwrap().contact_person = Some("  ".into());
        assert_eq!(project(&s).requestor_name.as_deref(), Some("Lio Technologies GmbH"));
    }

    #[test]
    fn maps_lines_totals_and_currency() {
        let data = project(&structure());
        assert_eq!(data.vendor_name, "Gärtner Gregg GmbH");
        assert_eq!(data.title.as_deref(), Some("Moos-Wand"));
        assert_eq!(data.order_lines[0].amount, 1.0);
        assert_eq!(data.order_lines[0].position_description, "Moos-Wand");
        assert_eq!(data.total_cost, 1438.0);
        assert_eq!(data.currency, DEFAULT_CURRENCY);
        assert_eq!(data.confidence, 0.9);
        assert_eq!(data.commodity_group, None);
    }
}
