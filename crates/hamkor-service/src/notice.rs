//! Texts sent to users over the chat channel.

/// Sender label used in notifications; profiles are not part of this backend.
pub const SENDER_LABEL: &str = "Foydalanuvchi";

pub fn otp_code(code: &str) -> String {
  format!("Sizning HamkorQurilish tasdiqlash kodingiz: {code}\n\nUshbu kodni saytga kiriting.")
}

/// Notification for a new text message, quoting at most `preview_chars`
/// characters of it.
pub fn new_message(content: &str, preview_chars: usize) -> String {
  format!("🔔 Yangi xabar!\n\n👤 {SENDER_LABEL}:\n{}", preview(content, preview_chars))
}

/// Caption of the photo forwarded for a new image message. Unlike the text
/// notification, the accompanying text is cut without a marker.
pub fn new_image(content: Option<&str>, preview_chars: usize) -> String {
  let caption = format!("🔔 Yangi rasm yuborildi!\n\n👤 {SENDER_LABEL}");
  match content {
    Some(text) => format!("{caption}\n\n{}", clip(text, preview_chars)),
    None => caption,
  }
}

/// Truncate on a character boundary, marking the cut with `...`.
fn preview(text: &str, max_chars: usize) -> String {
  let head = clip(text, max_chars);
  if head.len() < text.len() {
    format!("{head}...")
  } else {
    head.to_owned()
  }
}

/// At most `max_chars` leading characters of `text`.
fn clip(text: &str, max_chars: usize) -> &str {
  match text.char_indices().nth(max_chars) {
    Some((cut, _)) => &text[..cut],
    None => text,
  }
}
