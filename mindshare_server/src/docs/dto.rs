use crate::{auth, info, regions, users};
use mindshare_core::{
    region::{Region, RegionEntry},
    users::dto::{UpsertUserResponse, User, UserExistsResponse},
};
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    paths(
        info::handler::ping,
        info::handler::health,
        auth::handler::auth_start,
        auth::handler::auth_callback,
        users::handler::list_users,
        users::handler::check_user,
        users::handler::upsert_user,
        regions::handler::regions,
    ),
    components(schemas(
        info::dto::Health,
        Region,
        RegionEntry,
        User,
        UserExistsResponse,
        UpsertUserResponse
    ))
)]
pub struct ApiDoc;
