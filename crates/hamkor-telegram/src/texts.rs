//! What the bot says, and the keyboards it shows.

use crate::wire::{InlineButton, KeyboardButton, ReplyMarkup};

// ─── Buttons and callbacks ───────────────────────────────────────────────────

pub const SHARE_PHONE_BUTTON: &str = "Raqamni ulash 📱";
pub const ADS_BUTTON: &str = "Reklama berish 📢";
pub const ADMIN_BUTTON: &str = "Adminga murojaat 👨‍💻";
pub const SEND_PHONE_BUTTON: &str = "📞 Telefon raqamni yuborish";

pub const CB_CONTACT_ADMIN: &str = "contact_admin";
pub const CB_ADS_PRICES: &str = "ads_prices";
pub const CB_FAQ: &str = "faq";

const SITE_URL: &str = "https://hamkorqurilish.uz";

// ─── Texts ───────────────────────────────────────────────────────────────────

pub const WELCOME: &str = "Xush kelibsiz! HamkorQurilish platformasi rasmiy botiga xush kelibsiz.\n\n\
  Raqamingizni tasdiqlash uchun 'Raqamni ulash' tugmasini bosing yoki quyidagi bo'limlardan birini tanlang.";

pub const HELP: &str = "Assalomu alaykum! HamkorQurilish qo'llab-quvvatlash bo'limiga xush kelibsiz.\n\
  Sizga qanday yordam bera olamiz?";

pub const LINKED: &str =
  "Raqamingiz muvaffaqiyatli bog'landi! Endi sayt orqali tizimga kirishingiz mumkin.";

pub const REGISTERED: &str =
  "Siz muvaffaqiyatli ro'yxatdan o'tdingiz! Endi sayt orqali tizimga kirishingiz mumkin.";

pub const NOT_OWN_CONTACT: &str =
  "Iltimos, 'Raqamni ulash' tugmasi orqali o'zingizning raqamingizni yuboring.";

pub const FAILURE: &str = "Xatolik yuz berdi. Iltimos keyinroq qayta urinib ko'ring.";

pub const ADS_INFO: &str = "📢 Reklama xizmati bo'yicha ma'lumot:\n\n\
  Siz platformamizda splash, banner yoki inline turdagi reklamalarni joylashtirishingiz mumkin.\n\n\
  Batafsil ma'lumot va narxlar uchun 'Adminga murojaat' tugmasini bosing.";

pub const ADS_PRICES: &str = "💰 Reklama narxlari:\n\n\
  1. Asosiy sahifada banner: 100,000 so'm/hafta\n\
  2. E'lonni TOP'ga chiqarish: 50,000 so'm/hafta\n\
  3. Telegram kanalda e'lon: 30,000 so'm";

pub const FAQ: &str = "❓ Ko'p beriladigan savollar:\n\n\
  Q: Qanday qilib e'lon beraman?\n\
  A: Ilovadagi '+' tugmasini bosing.\n\n\
  Q: Profilni qanday tasdiqlayman?\n\
  A: Adminga pasport rasmini yuboring.";

pub const ASK_MESSAGE: &str =
  "Sizning murojaatingiz adminga yuboriladi. Iltimos, xabaringizni yozing:";

pub const ASK_PHONE: &str = "Murojaatingiz qabul qilindi. Adminga siz bilan bog'lanishi uchun \
  iltimos, telefon raqamingizni yuboring:";

pub const REPORT_SENT: &str =
  "Rahmat! Murojaatingiz adminga yetkazildi. Tez orada siz bilan bog'lanishadi.";

/// The message forwarded to the support channel.
pub fn support_report(
  full_name: &str,
  username: Option<&str>,
  phone: &str,
  message: &str,
) -> String {
  let username = username.map_or_else(|| "Noma'lum".to_owned(), |u| format!("@{u}"));
  format!(
    "🆕 Yangi murojaat!\n\n👤 Foydalanuvchi: {full_name}\n🆔 Username: {username}\n\
     📞 Tel: {phone}\n\n📝 Xabar:\n{message}"
  )
}

// ─── Keyboards ───────────────────────────────────────────────────────────────

/// Shown with `/start`.
pub fn main_keyboard() -> ReplyMarkup {
  ReplyMarkup::Keyboard {
    keyboard:          vec![
      vec![KeyboardButton { text: SHARE_PHONE_BUTTON, request_contact: true }],
      vec![
        KeyboardButton { text: ADS_BUTTON, request_contact: false },
        KeyboardButton { text: ADMIN_BUTTON, request_contact: false },
      ],
    ],
    resize_keyboard:   true,
    one_time_keyboard: false,
  }
}

/// Shown with `/help`.
pub fn help_keyboard() -> ReplyMarkup {
  let cb = |text, data| InlineButton { text, callback_data: Some(data), url: None };
  ReplyMarkup::Inline {
    inline_keyboard: vec![
      vec![cb("👨‍💻 Adminga murojaat", CB_CONTACT_ADMIN)],
      vec![cb("💰 Reklama narxlari", CB_ADS_PRICES)],
      vec![cb("❓ Ko'p beriladigan savollar", CB_FAQ)],
      vec![InlineButton { text: "🌐 Saytga o'tish", callback_data: None, url: Some(SITE_URL) }],
    ],
  }
}

/// One-shot keyboard asking for the phone during a support conversation.
pub fn send_phone_keyboard() -> ReplyMarkup {
  ReplyMarkup::Keyboard {
    keyboard:          vec![vec![KeyboardButton { text: SEND_PHONE_BUTTON, request_contact: true }]],
    resize_keyboard:   true,
    one_time_keyboard: true,
  }
}

pub fn remove_keyboard() -> ReplyMarkup { ReplyMarkup::Remove { remove_keyboard: true } }
