/// Fixed catalogs: coupons, purchasable tiers, and settlement banks
use crate::models::Tier;
use serde::Serialize;

/// Coupon codes and the amount each credits
pub const COUPONS: &[(&str, i64)] = &[("WELCOME500", 500), ("LOOPPRO", 1000), ("STOICTRUST", 2500)];

/// Purchasable tier with its price and reward multiplier
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TierOffer {
    pub tier: Tier,
    pub price: i64,
    pub multiplier: f64,
}

pub const TIER_OFFERS: &[TierOffer] = &[
    TierOffer {
        tier: Tier::Gold,
        price: 2500,
        multiplier: 1.5,
    },
    TierOffer {
        tier: Tier::Elite,
        price: 5000,
        multiplier: 2.5,
    },
    TierOffer {
        tier: Tier::Platinum,
        price: 10000,
        multiplier: 5.0,
    },
];

/// Settlement bank
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Bank {
    pub id: &'static str,
    pub name: &'static str,
    pub code: &'static str,
}

pub const BANKS: &[Bank] = &[
    Bank { id: "1", name: "Access Bank", code: "044" },
    Bank { id: "2", name: "First Bank", code: "011" },
    Bank { id: "3", name: "GTBank", code: "058" },
    Bank { id: "4", name: "UBA", code: "033" },
    Bank { id: "5", name: "Zenith Bank", code: "057" },
    Bank { id: "6", name: "Kuda Bank", code: "50211" },
    Bank { id: "7", name: "OPay", code: "999992" },
    Bank { id: "8", name: "PalmPay", code: "999991" },
    Bank { id: "9", name: "Moniepoint", code: "50515" },
];

/// Case-insensitive coupon lookup, returning the canonical code and its amount
pub fn coupon_value(code: &str) -> Option<(&'static str, i64)> {
    let code = code.trim();
    COUPONS
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(code))
        .copied()
}

pub fn tier_offer(tier: Tier) -> Option<TierOffer> {
    TIER_OFFERS.iter().find(|offer| offer.tier == tier).copied()
}

pub fn bank_by_id(id: &str) -> Option<Bank> {
    BANKS.iter().find(|bank| bank.id == id).copied()
}
