use std::sync::Arc;

use crate::{
    cli::{print_raw, run_api_call},
    info,
    spotify::{self, auth::Authorizer},
};

pub async fn profile(authorizer: Arc<Authorizer>, json: bool) {
    if json {
        print_raw(&authorizer, spotify::profile::current_user_request()).await;
        return;
    }

    let Some(user) = run_api_call(&authorizer, || spotify::profile::current_user(&authorizer)).await
    else {
        return;
    };

    info!("Id: {}", user.id);
    info!("Name: {}", user.display_name.as_deref().unwrap_or("-"));
    info!("Email: {}", user.email.as_deref().unwrap_or("-"));
    info!("Country: {}", user.country.as_deref().unwrap_or("-"));
    info!("Product: {}", user.product.as_deref().unwrap_or("-"));
    if let Some(followers) = user.followers {
        info!("Followers: {}", followers.total);
    }
}
