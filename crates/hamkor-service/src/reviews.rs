//! Reviews between identities and the derived rating.

use std::sync::Arc;

use hamkor_core::{
  identity::Identity,
  review::{NewReview, Review, STARS},
  store::MarketStore,
};
use tracing::info;
use uuid::Uuid;

use crate::{Error, Result};

pub struct ReviewBook<S> {
  store: Arc<S>,
}

impl<S> Clone for ReviewBook<S> {
  fn clone(&self) -> Self { Self { store: Arc::clone(&self.store) } }
}

impl<S: MarketStore> ReviewBook<S> {
  pub fn new(store: Arc<S>) -> Self { Self { store } }

  /// Record a review by `author` of `target_id`; the target's rating is
  /// recomputed in the same store transaction.
  pub async fn submit(
    &self,
    author: &Identity,
    target_id: Uuid,
    stars: i64,
    text: Option<String>,
  ) -> Result<Review> {
    if author.identity_id == target_id {
      return Err(Error::SelfReview);
    }
    let stars = u8::try_from(stars)
      .ok()
      .filter(|s| STARS.contains(s))
      .ok_or(Error::InvalidRating(stars))?;
    self.require(target_id).await?;

    let review = self
      .store
      .add_review(NewReview {
        from_id: author.identity_id,
        to_id: target_id,
        stars,
        text: text.filter(|t| !t.trim().is_empty()),
      })
      .await
      .map_err(Error::store)?;
    info!(review = %review.review_id, target = %target_id, stars, "recorded review");
    Ok(review)
  }

  /// Reviews received by `target_id`, newest first.
  pub async fn for_identity(&self, target_id: Uuid) -> Result<Vec<Review>> {
    self.require(target_id).await?;
    self.store.reviews_for(target_id).await.map_err(Error::store)
  }

  async fn require(&self, id: Uuid) -> Result<()> {
    match self.store.identity(id).await.map_err(Error::store)? {
      Some(_) => Ok(()),
      None => Err(Error::NotFound("user")),
    }
  }
}
