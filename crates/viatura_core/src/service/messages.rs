//! Feed message wording.

use crate::model::inventory::ToolCondition;

pub fn material_used(actor: &str, amount: u32, unit: &str, material: &str) -> String {
    format!("{actor} used {amount} {unit} of \"{material}\".")
}

pub fn material_restocked(actor: &str, amount: u32, unit: &str, material: &str) -> String {
    format!("{actor} added {amount} {unit} of \"{material}\".")
}

pub fn low_stock(material: &str, quantity: u32, unit: &str) -> String {
    format!("Low stock: \"{material}\" is at {quantity} {unit}.")
}

pub fn material_stocked(actor: &str, material: &str) -> String {
    format!("{actor} added new material \"{material}\".")
}

pub fn tool_added(actor: &str, tool: &str) -> String {
    format!("{actor} added new tool \"{tool}\".")
}

pub fn tool_removed(actor: &str, tool: &str) -> String {
    format!("{actor} removed tool \"{tool}\".")
}

pub fn tool_condition_changed(actor: &str, tool: &str, condition: ToolCondition) -> String {
    format!(
        "{actor} marked tool \"{tool}\" as {}.",
        condition_label(condition)
    )
}

pub fn defect_reported(actor: &str, description: &str) -> String {
    format!("{actor} reported a defect: \"{description}\"")
}

pub fn defect_resolved(actor: &str, description: &str) -> String {
    format!("{actor} resolved the defect: \"{description}\"")
}

pub fn access_requested(user: &str, vehicle: &str) -> String {
    format!("{user} requested access to vehicle {vehicle}.")
}

pub fn access_approved(user: &str, vehicle: &str) -> String {
    format!("Access of {user} to {vehicle} approved.")
}

fn condition_label(condition: ToolCondition) -> &'static str {
    match condition {
        ToolCondition::Good => "good",
        ToolCondition::NeedsRepair => "needs repair",
        ToolCondition::Broken => "broken",
    }
}

#[cfg(test)]
mod tests {
    use super::{low_stock, material_used, tool_condition_changed};
    use crate::model::inventory::ToolCondition;

    #[test]
    fn stock_messages_name_amount_and_unit() {
        assert_eq!(
            material_used("João Silva", 3, "rolos", "Fita Isolante"),
            "João Silva used 3 rolos of \"Fita Isolante\"."
        );
        assert_eq!(
            low_stock("Fita Isolante", 5, "rolos"),
            "Low stock: \"Fita Isolante\" is at 5 rolos."
        );
    }

    #[test]
    fn condition_message_uses_readable_label() {
        assert_eq!(
            tool_condition_changed("Maria", "Power Meter", ToolCondition::NeedsRepair),
            "Maria marked tool \"Power Meter\" as needs repair."
        );
    }
}
