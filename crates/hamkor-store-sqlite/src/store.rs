//! [`SqliteStore`]: the SQLite implementation of [`MarketStore`].

use std::path::Path;

use chrono::{DateTime, SubsecRound, Utc};
use rusqlite::{OptionalExtension as _, TransactionBehavior};
use uuid::Uuid;

use hamkor_core::{
  identity::{ChatAccountId, ChatBinding, Identity, PendingOtp, Role},
  message::{utc_day_start, Admission, ChatSummary, Message, NewMessage},
  review::{NewReview, Review},
  store::MarketStore,
};

use crate::{
  encode::{
    encode_dt, encode_role, encode_uuid, fold_chat_rows, read_identity, read_message,
    read_review, RawChatRow, RawIdentity, RawMessage, RawReview, IDENTITY_COLUMNS,
    MESSAGE_COLUMNS, REVIEW_COLUMNS,
  },
  schema::SCHEMA,
  Error, Result,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Hamkor marketplace store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

/// What the rate-limited insert decided, before decoding.
enum RawAdmission {
  Recorded(RawMessage),
  RateLimited(u32),
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store for tests.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Store timestamps at the precision the column can round-trip.
  fn now() -> DateTime<Utc> { Utc::now().trunc_subsecs(6) }
}

// ─── MarketStore impl ────────────────────────────────────────────────────────

impl MarketStore for SqliteStore {
  type Error = Error;

  // ── Identities ────────────────────────────────────────────────────────────

  async fn identity(&self, id: Uuid) -> Result<Option<Identity>> {
    let id_str = encode_uuid(id);

    let raw: Option<RawIdentity> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            &format!("SELECT {IDENTITY_COLUMNS} FROM identities WHERE identity_id = ?1"),
            rusqlite::params![id_str],
            read_identity,
          )
          .optional()?)
      })
      .await?;

    raw.map(RawIdentity::into_identity).transpose()
  }

  async fn identity_by_phone<'a>(&'a self, phone: &'a str) -> Result<Option<Identity>> {
    let phone = phone.to_owned();

    let raw: Option<RawIdentity> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            &format!("SELECT {IDENTITY_COLUMNS} FROM identities WHERE phone = ?1"),
            rusqlite::params![phone],
            read_identity,
          )
          .optional()?)
      })
      .await?;

    raw.map(RawIdentity::into_identity).transpose()
  }

  async fn upsert_login<'a>(&'a self, phone: &'a str, role: Option<Role>) -> Result<Identity> {
    let id_str   = encode_uuid(Uuid::new_v4());
    let phone    = phone.to_owned();
    let role_str = role.map(encode_role);
    let at_str   = encode_dt(Self::now());

    let raw: RawIdentity = self
      .conn
      .call(move |conn| {
        Ok(conn.query_row(
          &format!(
            "INSERT INTO identities (identity_id, phone, role, created_at)
             VALUES (?1, ?2, COALESCE(?3, 'customer'), ?4)
             ON CONFLICT(phone) DO UPDATE SET role = COALESCE(?3, role)
             RETURNING {IDENTITY_COLUMNS}"
          ),
          rusqlite::params![id_str, phone, role_str, at_str],
          read_identity,
        )?)
      })
      .await?;

    raw.into_identity()
  }

  async fn set_role(&self, id: Uuid, role: Role) -> Result<Identity> {
    let id_str   = encode_uuid(id);
    let role_str = encode_role(role);

    let raw: Option<RawIdentity> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            &format!(
              "UPDATE identities SET role = ?2 WHERE identity_id = ?1
               RETURNING {IDENTITY_COLUMNS}"
            ),
            rusqlite::params![id_str, role_str],
            read_identity,
          )
          .optional()?)
      })
      .await?;

    raw.ok_or(Error::IdentityNotFound(id))?.into_identity()
  }

  async fn bind_chat<'a>(&'a self, phone: &'a str, account: ChatAccountId) -> Result<ChatBinding> {
    let id_str = encode_uuid(Uuid::new_v4());
    let phone  = phone.to_owned();
    let at_str = encode_dt(Self::now());

    let (existed, raw): (bool, RawIdentity) = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let existed = tx
          .query_row(
            "SELECT 1 FROM identities WHERE phone = ?1",
            rusqlite::params![phone],
            |_| Ok(true),
          )
          .optional()?
          .unwrap_or(false);

        // The account follows the most recent contact share.
        tx.execute(
          "UPDATE identities SET chat_binding_id = NULL
           WHERE chat_binding_id = ?1 AND phone != ?2",
          rusqlite::params![account, phone],
        )?;

        let raw = tx.query_row(
          &format!(
            "INSERT INTO identities (identity_id, phone, chat_binding_id, role, created_at)
             VALUES (?1, ?2, ?3, 'customer', ?4)
             ON CONFLICT(phone) DO UPDATE SET chat_binding_id = excluded.chat_binding_id
             RETURNING {IDENTITY_COLUMNS}"
          ),
          rusqlite::params![id_str, phone, account, at_str],
          read_identity,
        )?;

        tx.commit()?;
        Ok((existed, raw))
      })
      .await?;

    Ok(ChatBinding { identity: raw.into_identity()?, created: !existed })
  }

  // ── One-time codes ────────────────────────────────────────────────────────

  async fn set_pending_otp(&self, id: Uuid, otp: PendingOtp) -> Result<()> {
    let id_str = encode_uuid(id);
    let at_str = encode_dt(otp.issued_at);
    let code   = otp.code;

    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE identities SET otp_code = ?2, otp_issued_at = ?3 WHERE identity_id = ?1",
          rusqlite::params![id_str, code, at_str],
        )?)
      })
      .await?;

    if changed == 0 {
      return Err(Error::IdentityNotFound(id));
    }
    Ok(())
  }

  async fn take_pending_otp<'a>(&'a self, id: Uuid, expected: &'a PendingOtp) -> Result<bool> {
    let id_str = encode_uuid(id);
    let code   = expected.code.clone();
    let at_str = encode_dt(expected.issued_at);

    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE identities SET otp_code = NULL, otp_issued_at = NULL
           WHERE identity_id = ?1 AND otp_code = ?2 AND otp_issued_at = ?3",
          rusqlite::params![id_str, code, at_str],
        )?)
      })
      .await?;

    Ok(changed == 1)
  }

  // ── Messages ──────────────────────────────────────────────────────────────

  async fn image_messages_since(&self, sender: Uuid, since: DateTime<Utc>) -> Result<u32> {
    let sender_str = encode_uuid(sender);
    let since_str  = encode_dt(since);

    let count: u32 = self
      .conn
      .call(move |conn| {
        Ok(conn.query_row(
          "SELECT COUNT(*) FROM messages
           WHERE sender_id = ?1 AND image_url IS NOT NULL AND created_at >= ?2",
          rusqlite::params![sender_str, since_str],
          |r| r.get(0),
        )?)
      })
      .await?;

    Ok(count)
  }

  async fn record_message(
    &self,
    input:       NewMessage,
    image_limit: u32,
    now:         DateTime<Utc>,
  ) -> Result<Admission> {
    // The window and the timestamp come from the same instant.
    let now          = now.trunc_subsecs(6);
    let has_image    = input.has_image();
    let id_str       = encode_uuid(Uuid::new_v4());
    let sender_str   = encode_uuid(input.sender_id);
    let receiver_str = encode_uuid(input.receiver_id);
    let since_str    = encode_dt(utc_day_start(now));
    let at_str       = encode_dt(now);
    let content      = input.content;
    let image_url    = input.image_url;

    let outcome: RawAdmission = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        if has_image {
          let sent_today: u32 = tx.query_row(
            "SELECT COUNT(*) FROM messages
             WHERE sender_id = ?1 AND image_url IS NOT NULL AND created_at >= ?2",
            rusqlite::params![sender_str, since_str],
            |r| r.get(0),
          )?;
          if sent_today >= image_limit {
            return Ok(RawAdmission::RateLimited(sent_today));
          }
        }

        let raw = tx.query_row(
          &format!(
            "INSERT INTO messages
               (message_id, sender_id, receiver_id, content, image_url, is_read, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, 0, ?6)
             RETURNING {MESSAGE_COLUMNS}"
          ),
          rusqlite::params![id_str, sender_str, receiver_str, content, image_url, at_str],
          read_message,
        )?;

        tx.commit()?;
        Ok(RawAdmission::Recorded(raw))
      })
      .await?;

    match outcome {
      RawAdmission::Recorded(raw) => Ok(Admission::Recorded(raw.into_message()?)),
      RawAdmission::RateLimited(sent_today) => Ok(Admission::RateLimited { sent_today }),
    }
  }

  async fn image_in_use(&self, image_url: String) -> Result<bool> {
    let in_use: bool = self
      .conn
      .call(move |conn| {
        Ok(conn.query_row(
          "SELECT EXISTS(SELECT 1 FROM messages WHERE image_url = ?1)",
          rusqlite::params![image_url],
          |r| r.get(0),
        )?)
      })
      .await?;

    Ok(in_use)
  }

  async fn conversation(&self, a: Uuid, b: Uuid) -> Result<Vec<Message>> {
    let a_str = encode_uuid(a);
    let b_str = encode_uuid(b);

    let raws: Vec<RawMessage> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {MESSAGE_COLUMNS} FROM messages
           WHERE (sender_id = ?1 AND receiver_id = ?2)
              OR (sender_id = ?2 AND receiver_id = ?1)
           ORDER BY created_at ASC, rowid ASC"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![a_str, b_str], read_message)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawMessage::into_message).collect()
  }

  async fn mark_read(&self, receiver: Uuid, sender: Uuid) -> Result<u64> {
    let receiver_str = encode_uuid(receiver);
    let sender_str   = encode_uuid(sender);

    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE messages SET is_read = 1
           WHERE receiver_id = ?1 AND sender_id = ?2 AND is_read = 0",
          rusqlite::params![receiver_str, sender_str],
        )?)
      })
      .await?;

    Ok(changed as u64)
  }

  async fn chat_summaries(&self, me: Uuid) -> Result<Vec<ChatSummary>> {
    let me_str = encode_uuid(me);

    let rows: Vec<RawChatRow> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT p.identity_id, p.phone, m.sender_id, m.content, m.is_read, m.created_at
           FROM messages m
           JOIN identities p ON p.identity_id =
             CASE WHEN m.sender_id = ?1 THEN m.receiver_id ELSE m.sender_id END
           WHERE m.sender_id = ?1 OR m.receiver_id = ?1
           ORDER BY m.created_at ASC, m.rowid ASC",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![me_str], |row| {
            Ok(RawChatRow {
              peer_id:    row.get(0)?,
              peer_phone: row.get(1)?,
              sender_id:  row.get(2)?,
              content:    row.get(3)?,
              is_read:    row.get(4)?,
              created_at: row.get(5)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    fold_chat_rows(me, rows)
  }

  // ── Reviews ───────────────────────────────────────────────────────────────

  async fn add_review(&self, input: NewReview) -> Result<Review> {
    let id_str   = encode_uuid(Uuid::new_v4());
    let from_str = encode_uuid(input.from_id);
    let to_str   = encode_uuid(input.to_id);
    let at_str   = encode_dt(Self::now());
    let stars    = input.stars;
    let text     = input.text;

    let raw: RawReview = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let raw = tx.query_row(
          &format!(
            "INSERT INTO reviews (review_id, from_id, to_id, stars, text, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             RETURNING {REVIEW_COLUMNS}"
          ),
          rusqlite::params![id_str, from_str, to_str, stars, text, at_str],
          read_review,
        )?;

        tx.execute(
          "UPDATE identities
           SET rating = (SELECT COALESCE(AVG(stars), 0.0) FROM reviews WHERE to_id = ?1)
           WHERE identity_id = ?1",
          rusqlite::params![to_str],
        )?;

        tx.commit()?;
        Ok(raw)
      })
      .await?;

    raw.into_review()
  }

  async fn reviews_for(&self, to: Uuid) -> Result<Vec<Review>> {
    let to_str = encode_uuid(to);

    let raws: Vec<RawReview> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {REVIEW_COLUMNS} FROM reviews
           WHERE to_id = ?1
           ORDER BY created_at DESC, rowid DESC"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![to_str], read_review)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawReview::into_review).collect()
  }
}
