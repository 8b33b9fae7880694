//! Standard ESI operations shipped with the client.

// self
use crate::{
	_prelude::*,
	call::{CallRegistry, CallTemplate, CallTemplateError},
	obs,
};

/// Builds a registry holding every standard operation.
pub fn standard() -> CallRegistry {
	assemble(templates())
}

/// Registers every valid template and reports the rejected ones as warnings.
fn assemble(templates: Vec<Result<CallTemplate, CallTemplateError>>) -> CallRegistry {
	templates.into_iter().fold(CallRegistry::new(), |registry, template| match template {
		Ok(template) => registry.register(template),
		Err(e) => {
			obs::log_rejected_template(&e);

			registry
		},
	})
}

fn templates() -> Vec<Result<CallTemplate, CallTemplateError>> {
	vec![
		CallTemplate::get("status", "/status/").cache_for(Duration::seconds(30)).build(),
		CallTemplate::get("alliances", "/alliances/").cache_for(Duration::hours(1)).build(),
		CallTemplate::get("alliance", "/alliances/{alliance_id}/")
			.cache_for(Duration::hours(1))
			.build(),
		CallTemplate::get("character", "/characters/{character_id}/")
			.cache_for(Duration::hours(1))
			.build(),
		CallTemplate::get("character_assets", "/characters/{character_id}/assets/")
			.scope("esi-assets.read_assets.v1")
			.cache_for(Duration::hours(1))
			.paginated()
			.build(),
		CallTemplate::get("character_wallet", "/characters/{character_id}/wallet/")
			.scope("esi-wallet.read_character_wallet.v1")
			.cache_for(Duration::seconds(120))
			.build(),
		CallTemplate::get("character_wallet_journal", "/characters/{character_id}/wallet/journal/")
			.scope("esi-wallet.read_character_wallet.v1")
			.cache_for(Duration::hours(1))
			.paginated()
			.build(),
		CallTemplate::get(
			"character_wallet_transactions",
			"/characters/{character_id}/wallet/transactions/",
		)
		.scope("esi-wallet.read_character_wallet.v1")
		.cache_for(Duration::hours(1))
		.build(),
		CallTemplate::get("character_skills", "/characters/{character_id}/skills/")
			.scope("esi-skills.read_skills.v1")
			.cache_for(Duration::seconds(120))
			.build(),
		CallTemplate::get("character_location", "/characters/{character_id}/location/")
			.scope("esi-location.read_location.v1")
			.cache_for(Duration::seconds(5))
			.build(),
		CallTemplate::get("character_orders", "/characters/{character_id}/orders/")
			.scope("esi-markets.read_character_orders.v1")
			.cache_for(Duration::seconds(1200))
			.build(),
		CallTemplate::get("character_contracts", "/characters/{character_id}/contracts/")
			.scope("esi-contracts.read_character_contracts.v1")
			.cache_for(Duration::seconds(300))
			.paginated()
			.build(),
		CallTemplate::get("corporation_members", "/corporations/{corporation_id}/members/")
			.scope("esi-corporations.read_corporation_membership.v1")
			.cache_for(Duration::hours(1))
			.build(),
		CallTemplate::get("market_orders", "/markets/{region_id}/orders/")
			.cache_for(Duration::seconds(300))
			.paginated()
			.build(),
		CallTemplate::get("market_history", "/markets/{region_id}/history/")
			.cache_for(Duration::hours(1))
			.build(),
		CallTemplate::get("market_prices", "/markets/prices/").cache_for(Duration::hours(1)).build(),
		CallTemplate::post("universe_names", "/universe/names/").build(),
		CallTemplate::get("universe_type", "/universe/types/{type_id}/")
			.cache_for(Duration::days(1))
			.build(),
	]
}
