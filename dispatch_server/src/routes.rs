//! Request handler definitions
//!
//! Define each route and it handler here.
//! Handlers that are more than a line or two MUST go into a separate module. Keep this module neat and tidy 🙏
//!
//! A note about performance:
//! Since each worker thread processes its requests sequentially, handlers which block the current thread will cause the
//! current worker to stop processing new requests. Database access and anything else that waits must be awaited, never
//! blocked on.
use actix_web::{get, web, HttpResponse, Responder};
use dispatch_engine::{realtime::PushDelivery, traits::DispatchDatabase, OperatorApi};
use log::*;
use serde_json::json;

use crate::errors::ServerError;

// Web-actix cannot handle generics in handlers, so it's implemented manually using the `route!` macro
#[macro_export]
macro_rules! route {
    ($name:ident => $method:ident $path:literal impl $($bounds:ty),+) => {
        paste::paste! { pub struct [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ >( $( core::marker::PhantomData<fn() -> [< T $bounds:camel> ] >,)+ );}
        paste::paste! { impl< $( [< T $bounds:camel> ],)+ > [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ > {
            #[allow(clippy::new_without_default)]
            pub fn new() -> Self {
                Self($( core::marker::PhantomData::<fn() -> [< T $bounds:camel> ] >,)+)
            }
        }}
        paste::paste! { impl<$( [< T $bounds:camel >] , )+> actix_web::dev::HttpServiceFactory for [<$name:camel Route>]<$([<T $bounds:camel>],)+>
        where
            $([<T $bounds:camel>]: $bounds + 'static,)+
        {
            fn register(self, config: &mut actix_web::dev::AppService) {
                let res = actix_web::Resource::new($path)
                    .name(stringify!($name))
                    .guard(actix_web::guard::$method())
                    .to($name::< $( [< T $bounds:camel >], )+>);
                actix_web::dev::HttpServiceFactory::register(res, config);
            }
        }}
    };
}

// ----------------------------------------------   Health  ----------------------------------------------------
#[get("/health")]
pub async fn health() -> impl Responder {
    trace!("💻️ Received health check request");
    HttpResponse::Ok().body("👍️\n")
}

//----------------------------------------------   Presence  ----------------------------------------------------
route!(online_admins => Get "/presence/admins" impl DispatchDatabase, PushDelivery);
pub async fn online_admins<B, P>(api: web::Data<OperatorApi<B, P>>) -> impl Responder
where
    B: DispatchDatabase,
    P: PushDelivery,
{
    let admins = api.online_admin_ids();
    trace!("💻️ {} admin(s) online", admins.len());
    HttpResponse::Ok().json(json!({ "admins": admins }))
}

route!(online_operators => Get "/presence/operators" impl DispatchDatabase, PushDelivery);
pub async fn online_operators<B, P>(api: web::Data<OperatorApi<B, P>>) -> Result<HttpResponse, ServerError>
where
    B: DispatchDatabase,
    P: PushDelivery,
{
    let operators = api.online_operators().await?;
    trace!("💻️ {} operator(s) online", operators.len());
    Ok(HttpResponse::Ok().json(operators))
}

route!(operator_online => Get "/presence/operators/{id}" impl DispatchDatabase, PushDelivery);
pub async fn operator_online<B, P>(path: web::Path<i64>, api: web::Data<OperatorApi<B, P>>) -> impl Responder
where
    B: DispatchDatabase,
    P: PushDelivery,
{
    let operator_id = path.into_inner();
    let online = api.is_operator_online(operator_id);
    HttpResponse::Ok().json(json!({ "operator_id": operator_id, "online": online }))
}
