use maud::{html, Markup};

use crate::session::{MembershipTier, UserProfile};

fn member_deals() -> Markup {
    html! {
        ul ."list-disc"."ml-6" {
            li {"Early access to weekly drops"}
            li {"Member pricing on house flower and pre-rolls"}
            li {"Free delivery on orders over $50"}
        }
    }
}

/// Marketing panel gated by membership tier. Pure presentational branching:
/// premium and admin members see the full content, basic members see an
/// upgrade prompt, and anonymous visitors see the full content as a
/// preview.
pub fn membership_panel(user: Option<&UserProfile>) -> Markup {
    let tier = user.map(|u| u.membership_tier);
    html! {
        ."card"."bg-base-200"."w-full" { ."card-body" {
            ."card-title" {"Canopy Club"}
            @match tier {
                Some(MembershipTier::Premium) | Some(MembershipTier::Admin) => {
                    p {"Thanks for being a Canopy Club member. Your perks this week:"}
                    (member_deals())
                }
                Some(MembershipTier::Basic) => {
                    p {"Upgrade to Canopy Club Premium to unlock member pricing and early drops."}
                    a ."btn"."btn-secondary" href="/membership/upgrade" {"Upgrade"}
                }
                _ => {
                    p {"Join the Canopy Club and get:"}
                    (member_deals())
                    a ."btn"."btn-secondary" href="/membership" {"Join Now"}
                }
            }
        }}
    }
}
