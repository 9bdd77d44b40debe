use crate::models::business::Business;
use crate::models::order::Order;

/// Number the checkout confirmation is sent to.
pub const CHECKOUT_PHONE: &str = "525534208385";

/// Prefilled confirmation text the client forwards over the messaging link
/// after checkout.
pub fn checkout_message(order: &Order, business: &Business) -> String {
    let items: Vec<String> = order
        .items
        .iter()
        .map(|item| format!("{}x {}", item.quantity, item.name))
        .collect();

    let mut message = format!(
        "Hola! Quiero confirmar mi pedido de {}\n\nMi pedido es:\n{}\n\nTotal: ${:.2}\n\nDireccion de entrega:\n{}",
        business.name,
        items.join("\n"),
        order.total_price,
        order.delivery_address.full_address,
    );

    if let Some(notes) = order.special_notes.as_deref().filter(|n| !n.is_empty()) {
        message.push_str("\n\nNotas especiales:\n");
        message.push_str(notes);
    }

    message.push_str(&format!("\n\nID del pedido: {}", order.id));
    message
}

pub fn whatsapp_link(phone: &str, message: &str) -> String {
    format!(
        "https://api.whatsapp.com/send?phone={phone}&text={}",
        percent_encode(message)
    )
}

// RFC 3986 unreserved characters pass through, everything else is escaped.
fn percent_encode(raw: &str) -> String {
    let mut encoded = String::with_capacity(raw.len() * 3);
    for byte in raw.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                encoded.push(byte as char);
            }
            _ => {
                encoded.push_str(&format!("%{byte:02X}"));
            }
        }
    }
    encoded
}
