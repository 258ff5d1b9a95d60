//! The seam between the adapters and whatever hosts the data.
//!
//! Each adapter asks only for the slice of the backend it touches.
//! [`mercado_db::Database`] implements all of them.

use anyhow::Result;
use mercado_db::Database;
use mercado_db::models::{
    AnalyticsRow, CategoryRow, ConversationRow, ListingRow, ListingWrite, MessageRow, ProfileRow,
    SearchParams,
};

pub trait ListingBackend {
    fn list_categories(&self) -> Result<Vec<CategoryRow>>;
    fn get_category(&self, id: &str) -> Result<Option<CategoryRow>>;
    fn get_category_by_slug(&self, slug: &str) -> Result<Option<CategoryRow>>;
    fn insert_listing(&self, listing: &ListingWrite) -> Result<()>;
    /// Owner-only; false when the write was refused or the row is absent.
    fn update_listing(&self, listing: &ListingWrite) -> Result<bool>;
    fn set_listing_status(&self, id: &str, owner_id: &str, status: &str) -> Result<bool>;
    fn update_listing_promotion(&self, id: &str, owner_id: &str, promotion: &str) -> Result<bool>;
    fn get_listing(&self, id: &str) -> Result<Option<ListingRow>>;
    fn listings_by_owner(&self, owner_id: &str) -> Result<Vec<ListingRow>>;
    /// Remote procedure `search_listings`.
    fn search_listings(&self, params: &SearchParams) -> Result<Vec<ListingRow>>;
}

pub trait CounterBackend {
    /// Remote procedure `increment_listing_counter`; atomic.
    fn increment_listing_counter(&self, listing_id: &str, counter_type: &str) -> Result<()>;
    fn get_listing_analytics(&self, listing_id: &str) -> Result<Option<AnalyticsRow>>;
    fn compare_and_set_analytics(
        &self,
        listing_id: &str,
        expected: AnalyticsRow,
        next: AnalyticsRow,
    ) -> Result<bool>;
}

pub trait FavoriteBackend {
    fn find_favorite(&self, user_id: &str, listing_id: &str) -> Result<Option<String>>;
    fn insert_favorite(&self, id: &str, user_id: &str, listing_id: &str) -> Result<()>;
    fn delete_favorite(&self, id: &str) -> Result<()>;
    fn favorite_listing_ids(&self, user_id: &str) -> Result<Vec<String>>;
    fn favorite_listings(&self, user_id: &str) -> Result<Vec<ListingRow>>;
}

pub trait ConversationBackend {
    /// Must honor at-most-one conversation per (listing, buyer).
    fn find_or_create_conversation(
        &self,
        id: &str,
        listing_id: &str,
        buyer_id: &str,
        seller_id: &str,
        created_at: &str,
    ) -> Result<ConversationRow>;
    fn get_conversation(&self, id: &str) -> Result<Option<ConversationRow>>;
    fn conversations_for_user(&self, user_id: &str) -> Result<Vec<ConversationRow>>;
    /// False when the sender is not a participant.
    fn insert_message(
        &self,
        id: &str,
        conversation_id: &str,
        sender_id: &str,
        body: &str,
        created_at: &str,
    ) -> Result<bool>;
    fn get_messages(&self, conversation_id: &str, viewer_id: &str) -> Result<Option<Vec<MessageRow>>>;
    fn mark_messages_read(&self, conversation_id: &str, reader_id: &str, read_at: &str) -> Result<usize>;
}

pub trait ProfileBackend {
    fn get_profile(&self, id: &str) -> Result<Option<ProfileRow>>;
    fn update_profile(&self, id: &str, name: Option<&str>, phone: Option<&str>) -> Result<bool>;
}

/// Everything the full marketplace needs.
pub trait Backend:
    ListingBackend + CounterBackend + FavoriteBackend + ConversationBackend + ProfileBackend
{
}

impl<T> Backend for T where
    T: ListingBackend + CounterBackend + FavoriteBackend + ConversationBackend + ProfileBackend
{
}

impl ListingBackend for Database {
    fn list_categories(&self) -> Result<Vec<CategoryRow>> {
        Database::list_categories(self)
    }

    fn get_category(&self, id: &str) -> Result<Option<CategoryRow>> {
        Database::get_category(self, id)
    }

    fn get_category_by_slug(&self, slug: &str) -> Result<Option<CategoryRow>> {
        Database::get_category_by_slug(self, slug)
    }

    fn insert_listing(&self, listing: &ListingWrite) -> Result<()> {
        Database::insert_listing(self, listing)
    }

    fn update_listing(&self, listing: &ListingWrite) -> Result<bool> {
        Database::update_listing(self, listing)
    }

    fn set_listing_status(&self, id: &str, owner_id: &str, status: &str) -> Result<bool> {
        Database::set_listing_status(self, id, owner_id, status)
    }

    fn update_listing_promotion(&self, id: &str, owner_id: &str, promotion: &str) -> Result<bool> {
        Database::update_listing_promotion(self, id, owner_id, promotion)
    }

    fn get_listing(&self, id: &str) -> Result<Option<ListingRow>> {
        Database::get_listing(self, id)
    }

    fn listings_by_owner(&self, owner_id: &str) -> Result<Vec<ListingRow>> {
        Database::listings_by_owner(self, owner_id)
    }

    fn search_listings(&self, params: &SearchParams) -> Result<Vec<ListingRow>> {
        Database::search_listings(self, params)
    }
}

impl CounterBackend for Database {
    fn increment_listing_counter(&self, listing_id: &str, counter_type: &str) -> Result<()> {
        Database::increment_listing_counter(self, listing_id, counter_type)
    }

    fn get_listing_analytics(&self, listing_id: &str) -> Result<Option<AnalyticsRow>> {
        Database::get_listing_analytics(self, listing_id)
    }

    fn compare_and_set_analytics(
        &self,
        listing_id: &str,
        expected: AnalyticsRow,
        next: AnalyticsRow,
    ) -> Result<bool> {
        Database::compare_and_set_analytics(self, listing_id, expected, next)
    }
}

impl FavoriteBackend for Database {
    fn find_favorite(&self, user_id: &str, listing_id: &str) -> Result<Option<String>> {
        Database::find_favorite(self, user_id, listing_id)
    }

    fn insert_favorite(&self, id: &str, user_id: &str, listing_id: &str) -> Result<()> {
        Database::insert_favorite(self, id, user_id, listing_id)
    }

    fn delete_favorite(&self, id: &str) -> Result<()> {
        Database::delete_favorite(self, id)
    }

    fn favorite_listing_ids(&self, user_id: &str) -> Result<Vec<String>> {
        Database::favorite_listing_ids(self, user_id)
    }

    fn favorite_listings(&self, user_id: &str) -> Result<Vec<ListingRow>> {
        Database::favorite_listings(self, user_id)
    }
}

impl ConversationBackend for Database {
    fn find_or_create_conversation(
        &self,
        id: &str,
        listing_id: &str,
        buyer_id: &str,
        seller_id: &str,
        created_at: &str,
    ) -> Result<ConversationRow> {
        Database::find_or_create_conversation(self, id, listing_id, buyer_id, seller_id, created_at)
    }

    fn get_conversation(&self, id: &str) -> Result<Option<ConversationRow>> {
        Database::get_conversation(self, id)
    }

    fn conversations_for_user(&self, user_id: &str) -> Result<Vec<ConversationRow>> {
        Database::conversations_for_user(self, user_id)
    }

    fn insert_message(
        &self,
        id: &str,
        conversation_id: &str,
        sender_id: &str,
        body: &str,
        created_at: &str,
    ) -> Result<bool> {
        Database::insert_message(self, id, conversation_id, sender_id, body, created_at)
    }

    fn get_messages(&self, conversation_id: &str, viewer_id: &str) -> Result<Option<Vec<MessageRow>>> {
        Database::get_messages(self, conversation_id, viewer_id)
    }

    fn mark_messages_read(&self, conversation_id: &str, reader_id: &str, read_at: &str) -> Result<usize> {
        Database::mark_messages_read(self, conversation_id, reader_id, read_at)
    }
}

impl ProfileBackend for Database {
    fn get_profile(&self, id: &str) -> Result<Option<ProfileRow>> {
        Database::get_profile(self, id)
    }

    fn update_profile(&self, id: &str, name: Option<&str>, phone: Option<&str>) -> Result<bool> {
        Database::update_profile(self, id, name, phone)
    }
}
