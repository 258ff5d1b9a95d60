use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Add-on plans a seller can buy for a listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanId {
    Vip,
    Premium,
    Highlight,
    TopBump,
    NewLabel,
    WebsiteLink,
}

impl PlanId {
    pub fn plan(self) -> &'static Plan {
        // CATALOG is declared in variant order
        &CATALOG[self as usize]
    }
}

/// Precedence-ordered promotion level: vip > premium > normal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanTier {
    Vip,
    Premium,
    #[default]
    Normal,
}

impl PlanTier {
    /// Only the paid tiers carry a duration and an expiry.
    pub fn is_timed(self) -> bool {
        matches!(self, Self::Vip | Self::Premium)
    }
}

/// Money amount in cents.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Price(pub u64);

impl std::iter::Sum for Price {
    fn sum<I: Iterator<Item = Price>>(iter: I) -> Self {
        Price(iter.map(|p| p.0).sum())
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}", self.0 / 100, self.0 % 100)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Plan {
    pub id: PlanId,
    pub title: &'static str,
    pub description: &'static str,
    pub price: Price,
    /// Human label for plans without a selectable duration.
    pub duration: &'static str,
    /// Whether selecting the plan also asks the seller for input (a URL).
    pub takes_input: bool,
}

pub static CATALOG: [Plan; 6] = [
    Plan {
        id: PlanId::Vip,
        title: "Anúncio VIP",
        description: "Espaço dedicado com fotos grandes",
        price: Price(9995),
        duration: "30 dias",
        takes_input: false,
    },
    Plan {
        id: PlanId::Premium,
        title: "Anúncio Premium",
        description: "Seu anúncio aparece acima dos que só têm a taxa de publicação.",
        price: Price(3998),
        duration: "30 dias",
        takes_input: false,
    },
    Plan {
        id: PlanId::Highlight,
        title: "Coloque cor em seu anúncio",
        description: "Seu anúncio aparece colorido de verde",
        price: Price(5995),
        duration: "30 dias",
        takes_input: false,
    },
    Plan {
        id: PlanId::TopBump,
        title: "Suba o seu anúncio / Ir para o topo",
        description: "O seu anúncio sobe na listagem do site. O plano ilimitado permite subidas a cada 20min.",
        price: Price(12995),
        duration: "30 dias ilimitado",
        takes_input: false,
    },
    Plan {
        id: PlanId::NewLabel,
        title: "Opção: NOVO",
        description: "Chame atenção para seu anúncio!",
        price: Price(6900),
        duration: "30 dias",
        takes_input: false,
    },
    Plan {
        id: PlanId::WebsiteLink,
        title: "Link do seu site",
        description: "Visitantes tem a opção de clicar e visitar seu site",
        price: Price(2499),
        duration: "30 dias",
        takes_input: true,
    },
];

/// Durations (days) offered for the timed tiers.
pub const DURATION_OPTIONS: [u32; 5] = [7, 15, 30, 60, 90];
pub const DEFAULT_DURATION_DAYS: u32 = 30;

/// Promotion state persisted on a listing, separate from its category attributes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PromotionState {
    pub promotions: BTreeSet<PlanId>,
    pub plan_tier: PlanTier,
    pub plan_expires_at: Option<DateTime<Utc>>,
    /// Empty unless `website_link` is among the promotions.
    pub website_url: String,
}

impl PromotionState {
    /// The tier in force at `now`; a timed tier past its expiry counts as normal.
    pub fn effective_tier(&self, now: DateTime<Utc>) -> PlanTier {
        match self.plan_expires_at {
            Some(expires) if self.plan_tier.is_timed() && expires > now => self.plan_tier,
            _ => PlanTier::Normal,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn price_formats_with_two_decimals() {
        assert_eq!(Price(15990).to_string(), "159.90");
        assert_eq!(Price(6900).to_string(), "69.00");
        assert_eq!(Price(5).to_string(), "0.05");
    }

    #[test]
    fn catalog_covers_every_plan() {
        for (index, plan) in CATALOG.iter().enumerate() {
            assert_eq!(plan.id as usize, index);
            assert_eq!(plan.id.plan().id, plan.id);
        }
    }

    #[test]
    fn expired_tier_is_normal() {
        let now = Utc::now();
        let state = PromotionState {
            plan_tier: PlanTier::Vip,
            plan_expires_at: Some(now - Duration::hours(1)),
            ..Default::default()
        };
        assert_eq!(state.effective_tier(now), PlanTier::Normal);
        assert_eq!(state.effective_tier(now - Duration::days(1)), PlanTier::Vip);
    }

    #[test]
    fn stored_state_uses_snake_case_ids() {
        let state: PromotionState = serde_json::from_str(
            r#"{"promotions":["top_bump","vip"],"plan_tier":"vip","website_url":""}"#,
        )
        .unwrap();
        assert!(state.promotions.contains(&PlanId::TopBump));
        assert_eq!(state.plan_tier, PlanTier::Vip);
        assert_eq!(state.plan_expires_at, None);
    }
}
