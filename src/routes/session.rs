use rocket::serde::json::Json;
use rocket::{Route, State};
use serde::Deserialize;

use crate::models::activity::UserActivity;
use crate::models::profile::{Profile, ProfileForm, Role};
use crate::security::auth::{AdminUser, CurrentUser};
use crate::services::{activity, session};

use super::{run, ApiResponse, AppState};

#[get("/me")]
fn me(user: CurrentUser) -> ApiResponse<Profile> {
    super::respond(Ok(user.profile))
}

#[patch("/me", data = "<form>")]
async fn update_me(state: &State<AppState>, user: CurrentUser, form: Json<ProfileForm>) -> ApiResponse<Profile> {
    let form = form.into_inner();
    run(state, move |s, c| session::update_profile(&s.adapter, &user.profile, &form, c)).await
}

#[derive(Debug, Deserialize)]
pub struct HeartbeatForm {
    pub path: Option<String>,
}

#[post("/me/heartbeat", data = "<form>")]
async fn heartbeat(
    state: &State<AppState>,
    user: CurrentUser,
    form: Option<Json<HeartbeatForm>>,
) -> ApiResponse<UserActivity> {
    let path = form.and_then(|f| f.into_inner().path);
    run(state, move |s, c| {
        activity::heartbeat(&s.adapter, &user.profile.id, path.as_deref(), c)
    })
    .await
}

#[derive(Debug, Deserialize)]
pub struct RoleForm {
    pub role: Role,
}

#[put("/users/<user_id>/role", data = "<form>")]
async fn set_role(
    state: &State<AppState>,
    admin: AdminUser,
    user_id: String,
    form: Json<RoleForm>,
) -> ApiResponse<Profile> {
    let role = form.role;
    run(state, move |s, c| session::set_role(&s.adapter, &admin.profile, &user_id, role, c)).await
}

pub fn routes() -> Vec<Route> {
    routes![me, update_me, heartbeat, set_role]
}
