// Host configuration checks that must pass before launching
//
// Azure Functions on the Flex Consumption plan need DD_AZURE_RESOURCE_GROUP;
// the serverless-compat binary cannot resolve the resource group there.

use crate::env::{EnvSource, DD_AZURE_RESOURCE_GROUP, WEBSITE_SKU};

const FLEX_CONSUMPTION_SKU: &str = "FlexConsumption";

/// True when running on Flex Consumption without DD_AZURE_RESOURCE_GROUP set.
pub fn is_azure_flex_without_resource_group<E: EnvSource + ?Sized>(env: &E) -> bool {
    env.get(WEBSITE_SKU).as_deref() == Some(FLEX_CONSUMPTION_SKU)
        && !env.is_set(DD_AZURE_RESOURCE_GROUP)
}
