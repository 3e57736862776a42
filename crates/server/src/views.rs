//! Conversions from engine models to the JSON bodies in `api_types`.

use api_types::{
    account::Profile,
    chat::{MessageKind, MessageView, RequestStatus},
    competition::{CompetitionStatus, CompetitionView},
    event::{EventStatus, EventView},
    leaderboard::{GlobalRow, LeaderboardRow},
    member::{MemberRole, MemberView},
    notification::NotificationView,
    payment::{PaymentStatus, PaymentView},
    pick::{EventPick, PickView},
};
use chrono::{DateTime, Utc};
use engine::{
    CompetitionDetail, EventPickView, GlobalLeaderboardEntry, LeaderboardEntry, MemberEntry,
    competitions, events, messages, notifications, payments, picks, users,
};

use crate::ServerError;

pub(crate) fn profile(user: users::Model) -> Profile {
    Profile {
        id: user.id,
        username: user.username,
        email: user.email,
        display_name: user.display_name,
        bio: user.bio,
        favorite_sport: user.favorite_sport,
        mfa_enabled: user.mfa_enabled,
        is_admin: user.is_admin,
        created_at: user.created_at,
    }
}

pub(crate) fn member_role(role: engine::MemberRole) -> MemberRole {
    match role {
        engine::MemberRole::Member => MemberRole::Member,
        engine::MemberRole::Commissioner => MemberRole::Commissioner,
    }
}

pub(crate) fn engine_member_role(role: MemberRole) -> engine::MemberRole {
    match role {
        MemberRole::Member => engine::MemberRole::Member,
        MemberRole::Commissioner => engine::MemberRole::Commissioner,
    }
}

/// A bare competition row. The invite code is shown only when
/// `with_invite_code` is set.
pub(crate) fn competition(
    model: competitions::Model,
    with_invite_code: bool,
) -> Result<CompetitionView, ServerError> {
    let status = match model.status()? {
        engine::CompetitionStatus::Active => CompetitionStatus::Active,
        engine::CompetitionStatus::Completed => CompetitionStatus::Completed,
    };
    Ok(CompetitionView {
        status,
        invite_code: with_invite_code.then_some(model.invite_code),
        id: model.id,
        name: model.name,
        description: model.description,
        is_public: model.is_public,
        starts_at: model.starts_at,
        ends_at: model.ends_at,
        entry_fee_minor: model.entry_fee_minor,
        prize_pool_minor: model.prize_pool_minor,
        owner_id: model.owner_id,
        member_count: None,
        role: None,
        created_at: model.created_at,
    })
}

pub(crate) fn competition_detail(detail: CompetitionDetail) -> Result<CompetitionView, ServerError> {
    let mut view = competition(detail.competition, detail.role.is_some())?;
    view.member_count = Some(detail.member_count);
    view.role = detail.role.map(member_role);
    view.prize_pool_minor = detail.prize_pool_minor;
    Ok(view)
}

pub(crate) fn member(entry: MemberEntry) -> MemberView {
    MemberView {
        user_id: entry.user_id,
        username: entry.username,
        display_name: entry.display_name,
        role: member_role(entry.role),
        score: entry.score,
        joined_at: entry.joined_at,
    }
}

pub(crate) fn event_status(status: engine::EventStatus) -> EventStatus {
    match status {
        engine::EventStatus::Upcoming => EventStatus::Upcoming,
        engine::EventStatus::Live => EventStatus::Live,
        engine::EventStatus::Completed => EventStatus::Completed,
    }
}

pub(crate) fn event(
    model: events::Model,
    competition_completed: bool,
    now: DateTime<Utc>,
) -> Result<EventView, ServerError> {
    let locked = engine::lock_reason(&model, competition_completed, now).is_some();
    Ok(EventView {
        options: model.options()?,
        status: event_status(model.status()?),
        locked,
        id: model.id,
        competition_id: model.competition_id,
        sport: model.sport,
        title: model.title,
        event_date: model.event_date,
        winner: model.winner,
        points: model.points,
    })
}

pub(crate) fn pick(model: picks::Model) -> PickView {
    PickView {
        id: model.id,
        event_id: model.event_id,
        selection: model.selection,
        is_correct: model.is_correct,
        points_awarded: model.points_awarded,
        updated_at: model.updated_at,
    }
}

pub(crate) fn event_pick(view: EventPickView) -> EventPick {
    EventPick {
        user_id: view.user_id,
        username: view.username,
        selection: view.selection,
        is_correct: view.is_correct,
        points_awarded: view.points_awarded,
    }
}

pub(crate) fn leaderboard_row(entry: LeaderboardEntry) -> LeaderboardRow {
    LeaderboardRow {
        rank: entry.rank,
        user_id: entry.user_id,
        username: entry.username,
        display_name: entry.display_name,
        score: entry.score,
        correct_picks: entry.correct_picks,
    }
}

pub(crate) fn global_row(entry: GlobalLeaderboardEntry) -> GlobalRow {
    GlobalRow {
        rank: entry.rank,
        user_id: entry.user_id,
        username: entry.username,
        display_name: entry.display_name,
        total_score: entry.total_score,
        competitions: entry.competitions,
    }
}

pub(crate) fn message(model: messages::Model) -> Result<MessageView, ServerError> {
    let kind = match model.kind()? {
        engine::MessageKind::Chat => MessageKind::Chat,
        engine::MessageKind::EventRequest => MessageKind::EventRequest,
    };
    let status = model.request_status()?.map(|status| match status {
        engine::RequestStatus::Pending => RequestStatus::Pending,
        engine::RequestStatus::Approved => RequestStatus::Approved,
        engine::RequestStatus::Rejected => RequestStatus::Rejected,
    });
    let request = model.event_request()?.map(|input| api_types::event::EventNew {
        sport: input.sport,
        title: input.title,
        options: input.options,
        event_date: input.event_date,
        points: input.points,
    });
    Ok(MessageView {
        id: model.id,
        competition_id: model.competition_id,
        user_id: model.user_id,
        kind,
        content: model.content,
        request,
        status,
        reviewed_by: model.reviewed_by,
        created_at: model.created_at,
    })
}

pub(crate) fn notification(model: notifications::Model) -> NotificationView {
    NotificationView {
        id: model.id,
        kind: model.kind,
        title: model.title,
        body: model.body,
        link: model.link,
        read: model.read,
        created_at: model.created_at,
    }
}

pub(crate) fn payment(model: payments::Model) -> Result<PaymentView, ServerError> {
    let status = match engine::PaymentStatus::try_from(model.status.as_str())? {
        engine::PaymentStatus::Pending => PaymentStatus::Pending,
        engine::PaymentStatus::Succeeded => PaymentStatus::Succeeded,
        engine::PaymentStatus::Failed => PaymentStatus::Failed,
    };
    Ok(PaymentView {
        id: model.id,
        competition_id: model.competition_id,
        amount_minor: model.amount_minor,
        currency: model.currency,
        status,
        created_at: model.created_at,
        updated_at: model.updated_at,
    })
}

pub(crate) fn event_new(input: api_types::event::EventNew) -> engine::EventNew {
    engine::EventNew {
        sport: input.sport,
        title: input.title,
        options: input.options,
        event_date: input.event_date,
        points: input.points,
    }
}
