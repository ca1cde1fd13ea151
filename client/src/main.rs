mod account;
mod admin;
mod api;
mod app;
mod board;
mod controls;
mod disaster;
mod geolocation;
mod kakao;
mod live_feed;
mod markers;
mod notice;
mod places;
mod route;
mod search;
mod session;
mod storage;
mod surface;
mod weather;

use leptos::mount::mount_to;
use leptos::prelude::*;
use std::any::Any;
use std::cell::RefCell;
use wasm_bindgen::JsCast;

use safenavi_shared::account::ProfileUpdate;

thread_local! {
    static APP_MOUNT_HANDLE: RefCell<Option<Box<dyn Any>>> = RefCell::new(None);
}

/// Page roots the bundle knows how to fill; each server-rendered page carries one of them.
const MAP_ROOT: &str = "app";
const SIGNUP_ROOT: &str = "signup-root";
const FIND_ACCOUNT_ROOT: &str = "find-account-root";
const PROFILE_ROOT: &str = "myinfo-root";
const ADMIN_DISASTER_ROOT: &str = "admin-disaster-root";

fn data(element: &web_sys::HtmlElement, key: &str) -> String {
    element.dataset().get(key).unwrap_or_default()
}

/// Profile values the server rendered into the root's `data-*` attributes.
fn profile_seed(root: &web_sys::HtmlElement) -> ProfileUpdate {
    ProfileUpdate {
        nickname: data(root, "nickname"),
        phone: data(root, "phone"),
        address: data(root, "address"),
        detail_address: data(root, "detailAddress"),
    }
}

fn mount(root: web_sys::HtmlElement, id: &str) -> Option<Box<dyn Any>> {
    let handle: Box<dyn Any> = match id {
        MAP_ROOT => Box::new(mount_to(root, app::App)),
        SIGNUP_ROOT => Box::new(mount_to(root, account::signup::SignupPage)),
        FIND_ACCOUNT_ROOT => Box::new(mount_to(root, account::find_account::FindAccountPage)),
        PROFILE_ROOT => {
            let initial = profile_seed(&root);
            Box::new(mount_to(root, move || {
                view! { <account::profile::ProfilePage initial=initial /> }
            }))
        }
        ADMIN_DISASTER_ROOT => Box::new(mount_to(root, admin::DisasterConsole)),
        _ => return None,
    };
    Some(handle)
}

fn main() {
    console_error_panic_hook::set_once();
    let Some(window) = web_sys::window() else {
        return;
    };
    let Some(document) = window.document() else {
        return;
    };
    let found = [
        MAP_ROOT,
        SIGNUP_ROOT,
        FIND_ACCOUNT_ROOT,
        PROFILE_ROOT,
        ADMIN_DISASTER_ROOT,
    ]
    .into_iter()
    .find_map(|id| {
        document
            .get_element_by_id(id)
            .and_then(|node| node.dyn_into::<web_sys::HtmlElement>().ok())
            .map(|root| (root, id))
    });
    let Some((root, id)) = found else {
        web_sys::console::warn_1(&"no mount root on this page".into());
        return;
    };

    APP_MOUNT_HANDLE.with(move |slot| {
        // Drop any earlier mount first so its effects stop before the new tree starts.
        let _old = slot.borrow_mut().take();
        *slot.borrow_mut() = mount(root, id);
    });
}
