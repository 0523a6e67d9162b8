//! Static Jira tool table.
//!
//! Every tool is a `JiraTool` variant. Name, parameters and request builder
//! are all `match`es over the enum, so adding a variant without wiring it up
//! fails to compile.
//!
//! Endpoints target Jira Server / Data Center: REST API v2 under
//! `/rest/api/2` and the Agile API under `/rest/agile/1.0`.

use chrono::Utc;
use serde_json::{json, Map, Value};

use super::args::{ArgumentError, ToolArgs};
use super::catalog::{check_params, ParamDef, ParamType, ToolAccess, ToolDefinition};
use super::plan::{Plan, Shape, TransitionPlan};
use crate::batch::BatchItem;
use crate::remote::{Method, RemoteRequest};

/// Format Jira expects for worklog `started` timestamps.
const JIRA_TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3f%z";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JiraTool {
    // Issues
    GetIssue,
    Search,
    GetProjectIssues,
    CreateIssue,
    BatchCreateIssues,
    UpdateIssue,
    DeleteIssue,
    AssignIssue,
    AddComment,
    GetComments,
    GetTransitions,
    TransitionIssue,
    GetWorklog,
    AddWorklog,
    BatchGetChangelogs,
    // Links and epics
    GetLinkTypes,
    CreateIssueLink,
    RemoveIssueLink,
    CreateRemoteIssueLink,
    LinkToEpic,
    GetEpicIssues,
    // Projects and versions
    ListProjects,
    GetProject,
    GetProjectVersions,
    CreateVersion,
    BatchCreateVersions,
    // Agile
    GetAgileBoards,
    GetBoardIssues,
    GetSprintsFromBoard,
    GetSprintIssues,
    CreateSprint,
    UpdateSprint,
    AddIssuesToSprint,
    // Users and fields
    GetCurrentUser,
    GetUserProfile,
    SearchFields,
}

impl JiraTool {
    pub const ALL: [JiraTool; 36] = [
        JiraTool::GetIssue,
        JiraTool::Search,
        JiraTool::GetProjectIssues,
        JiraTool::CreateIssue,
        JiraTool::BatchCreateIssues,
        JiraTool::UpdateIssue,
        JiraTool::DeleteIssue,
        JiraTool::AssignIssue,
        JiraTool::AddComment,
        JiraTool::GetComments,
        JiraTool::GetTransitions,
        JiraTool::TransitionIssue,
        JiraTool::GetWorklog,
        JiraTool::AddWorklog,
        JiraTool::BatchGetChangelogs,
        JiraTool::GetLinkTypes,
        JiraTool::CreateIssueLink,
        JiraTool::RemoveIssueLink,
        JiraTool::CreateRemoteIssueLink,
        JiraTool::LinkToEpic,
        JiraTool::GetEpicIssues,
        JiraTool::ListProjects,
        JiraTool::GetProject,
        JiraTool::GetProjectVersions,
        JiraTool::CreateVersion,
        JiraTool::BatchCreateVersions,
        JiraTool::GetAgileBoards,
        JiraTool::GetBoardIssues,
        JiraTool::GetSprintsFromBoard,
        JiraTool::GetSprintIssues,
        JiraTool::CreateSprint,
        JiraTool::UpdateSprint,
        JiraTool::AddIssuesToSprint,
        JiraTool::GetCurrentUser,
        JiraTool::GetUserProfile,
        JiraTool::SearchFields,
    ];

    pub fn name(self) -> &'static str {
        match self {
            JiraTool::GetIssue => "jira_get_issue",
            JiraTool::Search => "jira_search",
            JiraTool::GetProjectIssues => "jira_get_project_issues",
            JiraTool::CreateIssue => "jira_create_issue",
            JiraTool::BatchCreateIssues => "jira_batch_create_issues",
            JiraTool::UpdateIssue => "jira_update_issue",
            JiraTool::DeleteIssue => "jira_delete_issue",
            JiraTool::AssignIssue => "jira_assign_issue",
            JiraTool::AddComment => "jira_add_comment",
            JiraTool::GetComments => "jira_get_comments",
            JiraTool::GetTransitions => "jira_get_transitions",
            JiraTool::TransitionIssue => "jira_transition_issue",
            JiraTool::GetWorklog => "jira_get_worklog",
            JiraTool::AddWorklog => "jira_add_worklog",
            JiraTool::BatchGetChangelogs => "jira_batch_get_changelogs",
            JiraTool::GetLinkTypes => "jira_get_link_types",
            JiraTool::CreateIssueLink => "jira_create_issue_link",
            JiraTool::RemoveIssueLink => "jira_remove_issue_link",
            JiraTool::CreateRemoteIssueLink => "jira_create_remote_issue_link",
            JiraTool::LinkToEpic => "jira_link_to_epic",
            JiraTool::GetEpicIssues => "jira_get_epic_issues",
            JiraTool::ListProjects => "jira_list_projects",
            JiraTool::GetProject => "jira_get_project",
            JiraTool::GetProjectVersions => "jira_get_project_versions",
            JiraTool::CreateVersion => "jira_create_version",
            JiraTool::BatchCreateVersions => "jira_batch_create_versions",
            JiraTool::GetAgileBoards => "jira_get_agile_boards",
            JiraTool::GetBoardIssues => "jira_get_board_issues",
            JiraTool::GetSprintsFromBoard => "jira_get_sprints_from_board",
            JiraTool::GetSprintIssues => "jira_get_sprint_issues",
            JiraTool::CreateSprint => "jira_create_sprint",
            JiraTool::UpdateSprint => "jira_update_sprint",
            JiraTool::AddIssuesToSprint => "jira_add_issues_to_sprint",
            JiraTool::GetCurrentUser => "jira_get_current_user",
            JiraTool::GetUserProfile => "jira_get_user_profile",
            JiraTool::SearchFields => "jira_search_fields",
        }
    }

    /// Static catalog entry.
    pub fn definition(self) -> ToolDefinition {
        use ParamType::{Bool, Int, Object, ObjectList, StringList};
        use ToolAccess::{Destructive, ReadOnly, Write};

        let (description, parameters, access) = match self {
            JiraTool::GetIssue => (
                "Get the details of a Jira issue.",
                vec![
                    issue_key(),
                    ParamDef::optional("fields", text(), "Comma-separated fields to return, e.g. summary,status,assignee"),
                    ParamDef::optional("expand", text(), "Comma-separated expansions, e.g. renderedFields,changelog"),
                ],
                ReadOnly,
            ),
            JiraTool::Search => (
                "Search issues with JQL.",
                vec![
                    ParamDef::required("jql", text(), "JQL query, e.g. project = PROJ AND status = \"In Progress\""),
                    ParamDef::optional("fields", text(), "Comma-separated fields to return"),
                    ParamDef::optional("expand", text(), "Comma-separated expansions"),
                    start_at(),
                    max_results(50),
                ],
                ReadOnly,
            ),
            JiraTool::GetProjectIssues => (
                "List the issues of a project, newest first.",
                vec![project_key(), start_at(), max_results(50)],
                ReadOnly,
            ),
            JiraTool::CreateIssue => (
                "Create a Jira issue.",
                issue_create_params(),
                Write,
            ),
            JiraTool::BatchCreateIssues => (
                "Create several issues concurrently. Each item takes the same fields as jira_create_issue; failures are reported per item.",
                vec![ParamDef::required(
                    "issues",
                    ObjectList,
                    "Issues to create: objects with project_key, summary, issue_type and optional description, assignee, priority, labels, components, parent_key, additional_fields",
                )],
                Write,
            ),
            JiraTool::UpdateIssue => (
                "Update fields of an existing issue.",
                vec![
                    issue_key(),
                    ParamDef::required("fields", Object, "Fields to set, in Jira's REST format, e.g. {\"summary\": \"New title\"}"),
                    ParamDef::optional("update", Object, "Field update operations, in Jira's REST format"),
                    ParamDef::with_default("notify_users", Bool, "Send notification emails", json!(true)),
                ],
                Write,
            ),
            JiraTool::DeleteIssue => (
                "Delete an issue.",
                vec![
                    issue_key(),
                    ParamDef::with_default("delete_subtasks", Bool, "Also delete the issue's subtasks", json!(false)),
                ],
                Destructive,
            ),
            JiraTool::AssignIssue => (
                "Assign an issue to a user, or unassign it.",
                vec![
                    issue_key(),
                    ParamDef::optional("assignee", text(), "Username of the new assignee; omit to unassign"),
                ],
                Write,
            ),
            JiraTool::AddComment => (
                "Add a comment to an issue.",
                vec![
                    issue_key(),
                    ParamDef::required("comment", text(), "Comment text in Jira wiki markup"),
                ],
                Write,
            ),
            JiraTool::GetComments => (
                "Get the comments of an issue.",
                vec![
                    issue_key(),
                    ParamDef::optional("order", ParamType::Enum(vec!["asc", "desc"]), "Order by creation date"),
                    start_at(),
                    max_results(50),
                ],
                ReadOnly,
            ),
            JiraTool::GetTransitions => (
                "List the transitions currently available for an issue.",
                vec![issue_key()],
                ReadOnly,
            ),
            JiraTool::TransitionIssue => (
                "Move an issue through its workflow. The transition is matched exactly against the available transition ids and names.",
                vec![
                    issue_key(),
                    ParamDef::required("transition", text(), "Transition name (case-sensitive) or id"),
                    ParamDef::optional("fields", Object, "Fields to set during the transition, e.g. resolution"),
                    ParamDef::optional("comment", text(), "Comment to add with the transition"),
                ],
                Write,
            ),
            JiraTool::GetWorklog => (
                "Get the worklog entries of an issue.",
                vec![issue_key()],
                ReadOnly,
            ),
            JiraTool::AddWorklog => (
                "Log work on an issue.",
                vec![
                    issue_key(),
                    ParamDef::required("time_spent", text(), "Time spent in Jira duration format, e.g. 1h 30m"),
                    ParamDef::optional("comment", text(), "Worklog comment"),
                    ParamDef::optional("started", text(), "Start time, e.g. 2024-01-15T09:00:00.000+0000; defaults to now"),
                ],
                Write,
            ),
            JiraTool::BatchGetChangelogs => (
                "Fetch the change history of several issues concurrently. Failures are reported per issue.",
                vec![ParamDef::required("issue_keys", StringList, "Issue keys, e.g. [\"PROJ-1\", \"PROJ-2\"]")],
                ReadOnly,
            ),
            JiraTool::GetLinkTypes => (
                "List the issue link types.",
                vec![],
                ReadOnly,
            ),
            JiraTool::CreateIssueLink => (
                "Link two issues.",
                vec![
                    ParamDef::required("link_type", text(), "Link type name, e.g. Blocks, Duplicate, Relates"),
                    ParamDef::required("inward_issue_key", text(), "Inward issue key"),
                    ParamDef::required("outward_issue_key", text(), "Outward issue key"),
                    ParamDef::optional("comment", text(), "Comment added to the inward issue"),
                ],
                Write,
            ),
            JiraTool::RemoveIssueLink => (
                "Delete an issue link by id.",
                vec![ParamDef::required("link_id", text(), "Issue link id")],
                Destructive,
            ),
            JiraTool::CreateRemoteIssueLink => (
                "Attach a web link to an issue.",
                vec![
                    issue_key(),
                    ParamDef::required("url", text(), "Target URL"),
                    ParamDef::required("title", text(), "Link title"),
                    ParamDef::optional("summary", text(), "Link description"),
                    ParamDef::optional("relationship", text(), "Relationship label, e.g. documented by"),
                ],
                Write,
            ),
            JiraTool::LinkToEpic => (
                "Move an issue into an epic.",
                vec![
                    issue_key(),
                    ParamDef::required("epic_key", text(), "Epic issue key"),
                ],
                Write,
            ),
            JiraTool::GetEpicIssues => (
                "List the issues of an epic.",
                vec![
                    ParamDef::required("epic_key", text(), "Epic issue key"),
                    start_at(),
                    max_results(50),
                ],
                ReadOnly,
            ),
            JiraTool::ListProjects => (
                "List the projects visible to the account.",
                vec![],
                ReadOnly,
            ),
            JiraTool::GetProject => (
                "Get a project.",
                vec![project_key()],
                ReadOnly,
            ),
            JiraTool::GetProjectVersions => (
                "List the versions of a project.",
                vec![project_key()],
                ReadOnly,
            ),
            JiraTool::CreateVersion => (
                "Create a version in a project.",
                version_params(),
                Write,
            ),
            JiraTool::BatchCreateVersions => (
                "Create several versions in a project concurrently. Failures are reported per version.",
                vec![
                    project_key(),
                    ParamDef::required(
                        "versions",
                        ObjectList,
                        "Versions to create: objects with name and optional description, start_date, release_date, released, archived",
                    ),
                ],
                Write,
            ),
            JiraTool::GetAgileBoards => (
                "List agile boards.",
                vec![
                    ParamDef::optional("board_name", text(), "Filter by board name (substring)"),
                    ParamDef::optional("project_key", text(), "Filter by project key or id"),
                    ParamDef::optional("board_type", ParamType::Enum(vec!["scrum", "kanban", "simple"]), "Filter by board type"),
                    start_at(),
                    max_results(50),
                ],
                ReadOnly,
            ),
            JiraTool::GetBoardIssues => (
                "List the issues on a board.",
                vec![
                    board_id(),
                    ParamDef::optional("jql", text(), "Additional JQL filter"),
                    ParamDef::optional("fields", text(), "Comma-separated fields to return"),
                    start_at(),
                    max_results(50),
                ],
                ReadOnly,
            ),
            JiraTool::GetSprintsFromBoard => (
                "List the sprints of a board.",
                vec![
                    board_id(),
                    ParamDef::optional("state", sprint_state(), "Filter by sprint state"),
                    start_at(),
                    max_results(50),
                ],
                ReadOnly,
            ),
            JiraTool::GetSprintIssues => (
                "List the issues in a sprint.",
                vec![
                    sprint_id(),
                    ParamDef::optional("fields", text(), "Comma-separated fields to return"),
                    start_at(),
                    max_results(50),
                ],
                ReadOnly,
            ),
            JiraTool::CreateSprint => (
                "Create a sprint on a board.",
                vec![
                    board_id(),
                    ParamDef::required("name", text(), "Sprint name"),
                    ParamDef::optional("start_date", text(), "Start date, ISO 8601"),
                    ParamDef::optional("end_date", text(), "End date, ISO 8601"),
                    ParamDef::optional("goal", text(), "Sprint goal"),
                ],
                Write,
            ),
            JiraTool::UpdateSprint => (
                "Update a sprint. Only the supplied fields change.",
                vec![
                    sprint_id(),
                    ParamDef::optional("name", text(), "New sprint name"),
                    ParamDef::optional("state", sprint_state(), "New sprint state"),
                    ParamDef::optional("start_date", text(), "Start date, ISO 8601"),
                    ParamDef::optional("end_date", text(), "End date, ISO 8601"),
                    ParamDef::optional("goal", text(), "Sprint goal"),
                ],
                Write,
            ),
            JiraTool::AddIssuesToSprint => (
                "Move issues into a sprint.",
                vec![
                    sprint_id(),
                    ParamDef::required("issue_keys", StringList, "Issue keys to move"),
                ],
                Write,
            ),
            JiraTool::GetCurrentUser => (
                "Get the account the gateway is authenticated as.",
                vec![],
                ReadOnly,
            ),
            JiraTool::GetUserProfile => (
                "Get a user's profile.",
                vec![ParamDef::required("username", text(), "Username")],
                ReadOnly,
            ),
            JiraTool::SearchFields => (
                "List field definitions, optionally filtered by a keyword matched against field id and name.",
                vec![
                    ParamDef::optional("keyword", text(), "Case-insensitive keyword"),
                    ParamDef::with_default("limit", Int, "Maximum number of fields to return", json!(50)),
                ],
                ReadOnly,
            ),
        };

        ToolDefinition {
            tool: self,
            description,
            parameters,
            access,
        }
    }

    /// Build the execution plan for validated arguments.
    pub fn plan(self, args: &ToolArgs) -> Result<Plan, ArgumentError> {
        let plan = match self {
            JiraTool::GetIssue => Plan::single(
                template(Method::Get, "/rest/api/2/issue/{issue_key}", args)?
                    .with_optional_query("fields", args.opt_csv("fields"))
                    .with_optional_query("expand", args.opt_csv("expand")),
            ),
            JiraTool::Search => Plan::single(search_request(args.str("jql")?, args)),
            JiraTool::GetProjectIssues => {
                let jql = format!(
                    "project = \"{}\" ORDER BY created DESC",
                    args.str("project_key")?.replace('"', "\\\"")
                );
                Plan::single(search_request(&jql, args))
            }
            JiraTool::CreateIssue => Plan::single(
                RemoteRequest::new(Method::Post, "/rest/api/2/issue").with_body(issue_create_body(args)?),
            ),
            JiraTool::BatchCreateIssues => {
                let defs = issue_create_params();
                let items = args
                    .object_list("issues")?
                    .into_iter()
                    .enumerate()
                    .map(|(i, item)| -> Result<BatchItem, ArgumentError> {
                        let item = checked_item("issues", i, &defs, item)?;
                        let body = issue_create_body(&item)
                            .map_err(|e| ArgumentError::new(format!("issues[{}]: {}", i, e)))?;
                        Ok(BatchItem {
                            key: item.opt_string("summary").unwrap_or_else(|| i.to_string()),
                            request: RemoteRequest::new(Method::Post, "/rest/api/2/issue").with_body(body),
                        })
                    })
                    .collect::<Result<Vec<_>, ArgumentError>>()?;
                Plan::Batch(items)
            }
            JiraTool::UpdateIssue => {
                let mut body = json!({ "fields": required_object(args, "fields")? });
                if let Some(update) = args.value("update") {
                    body["update"] = update.clone();
                }
                let mut request = template(Method::Put, "/rest/api/2/issue/{issue_key}", args)?.with_body(body);
                if args.opt_bool("notify_users") == Some(false) {
                    request = request.with_query("notifyUsers", "false");
                }
                Plan::single(request)
            }
            JiraTool::DeleteIssue => Plan::single(
                template(Method::Delete, "/rest/api/2/issue/{issue_key}", args)?.with_query(
                    "deleteSubtasks",
                    args.opt_bool("delete_subtasks").unwrap_or(false).to_string(),
                ),
            ),
            JiraTool::AssignIssue => Plan::single(
                template(Method::Put, "/rest/api/2/issue/{issue_key}/assignee", args)?
                    .with_body(json!({ "name": args.opt_str("assignee") })),
            ),
            JiraTool::AddComment => Plan::single(
                template(Method::Post, "/rest/api/2/issue/{issue_key}/comment", args)?
                    .with_body(json!({ "body": args.str("comment")? })),
            ),
            JiraTool::GetComments => {
                let order_by = args
                    .opt_str("order")
                    .map(|order| if order == "desc" { "-created" } else { "created" })
                    .map(str::to_string);
                Plan::single(paged(
                    template(Method::Get, "/rest/api/2/issue/{issue_key}/comment", args)?
                        .with_optional_query("orderBy", order_by),
                    args,
                ))
            }
            JiraTool::GetTransitions => Plan::single(template(
                Method::Get,
                "/rest/api/2/issue/{issue_key}/transitions",
                args,
            )?),
            JiraTool::TransitionIssue => Plan::Transition(TransitionPlan {
                issue_key: args.str("issue_key")?.to_string(),
                transition: args.str("transition")?.to_string(),
                fields: args.value("fields").cloned(),
                comment: args.opt_string("comment"),
            }),
            JiraTool::GetWorklog => Plan::single(template(
                Method::Get,
                "/rest/api/2/issue/{issue_key}/worklog",
                args,
            )?),
            JiraTool::AddWorklog => {
                let started = args
                    .opt_string("started")
                    .unwrap_or_else(|| Utc::now().format(JIRA_TIMESTAMP_FORMAT).to_string());
                let mut body = json!({
                    "timeSpent": args.str("time_spent")?,
                    "started": started,
                });
                if let Some(comment) = args.opt_str("comment") {
                    body["comment"] = json!(comment);
                }
                Plan::single(
                    template(Method::Post, "/rest/api/2/issue/{issue_key}/worklog", args)?.with_body(body),
                )
            }
            JiraTool::BatchGetChangelogs => {
                let items = args
                    .string_list("issue_keys")?
                    .into_iter()
                    .map(|key| -> Result<BatchItem, ArgumentError> {
                        let mut params = Map::new();
                        params.insert("issue_key".to_string(), json!(key));
                        let request = RemoteRequest::from_template(
                            Method::Get,
                            "/rest/api/2/issue/{issue_key}",
                            &params,
                        )?
                        .with_query("expand", "changelog")
                        .with_query("fields", "summary");
                        Ok(BatchItem { key, request })
                    })
                    .collect::<Result<Vec<_>, ArgumentError>>()?;
                Plan::Batch(items)
            }
            JiraTool::GetLinkTypes => Plan::single(RemoteRequest::new(Method::Get, "/rest/api/2/issueLinkType")),
            JiraTool::CreateIssueLink => {
                let mut body = json!({
                    "type": { "name": args.str("link_type")? },
                    "inwardIssue": { "key": args.str("inward_issue_key")? },
                    "outwardIssue": { "key": args.str("outward_issue_key")? },
                });
                if let Some(comment) = args.opt_str("comment") {
                    body["comment"] = json!({ "body": comment });
                }
                Plan::single(RemoteRequest::new(Method::Post, "/rest/api/2/issueLink").with_body(body))
            }
            JiraTool::RemoveIssueLink => Plan::single(template(
                Method::Delete,
                "/rest/api/2/issueLink/{link_id}",
                args,
            )?),
            JiraTool::CreateRemoteIssueLink => {
                let mut object = json!({
                    "url": args.str("url")?,
                    "title": args.str("title")?,
                });
                if let Some(summary) = args.opt_str("summary") {
                    object["summary"] = json!(summary);
                }
                let mut body = json!({ "object": object });
                if let Some(relationship) = args.opt_str("relationship") {
                    body["relationship"] = json!(relationship);
                }
                Plan::single(
                    template(Method::Post, "/rest/api/2/issue/{issue_key}/remotelink", args)?.with_body(body),
                )
            }
            JiraTool::LinkToEpic => Plan::single(
                template(Method::Post, "/rest/agile/1.0/epic/{epic_key}/issue", args)?
                    .with_body(json!({ "issues": [args.str("issue_key")?] })),
            ),
            JiraTool::GetEpicIssues => Plan::single(paged(
                template(Method::Get, "/rest/agile/1.0/epic/{epic_key}/issue", args)?,
                args,
            )),
            JiraTool::ListProjects => Plan::single(RemoteRequest::new(Method::Get, "/rest/api/2/project")),
            JiraTool::GetProject => Plan::single(template(
                Method::Get,
                "/rest/api/2/project/{project_key}",
                args,
            )?),
            JiraTool::GetProjectVersions => Plan::single(template(
                Method::Get,
                "/rest/api/2/project/{project_key}/versions",
                args,
            )?),
            JiraTool::CreateVersion => Plan::single(
                RemoteRequest::new(Method::Post, "/rest/api/2/version")
                    .with_body(version_body(args.str("project_key")?, args)?),
            ),
            JiraTool::BatchCreateVersions => {
                let project_key = args.str("project_key")?;
                let defs = version_item_params();
                let items = args
                    .object_list("versions")?
                    .into_iter()
                    .enumerate()
                    .map(|(i, item)| -> Result<BatchItem, ArgumentError> {
                        let item = checked_item("versions", i, &defs, item)?;
                        let body = version_body(project_key, &item)
                            .map_err(|e| ArgumentError::new(format!("versions[{}]: {}", i, e)))?;
                        Ok(BatchItem {
                            key: item.opt_string("name").unwrap_or_else(|| i.to_string()),
                            request: RemoteRequest::new(Method::Post, "/rest/api/2/version").with_body(body),
                        })
                    })
                    .collect::<Result<Vec<_>, ArgumentError>>()?;
                Plan::Batch(items)
            }
            JiraTool::GetAgileBoards => Plan::single(paged(
                RemoteRequest::new(Method::Get, "/rest/agile/1.0/board")
                    .with_optional_query("name", args.opt_string("board_name"))
                    .with_optional_query("projectKeyOrId", args.opt_string("project_key"))
                    .with_optional_query("type", args.opt_string("board_type")),
                args,
            )),
            JiraTool::GetBoardIssues => Plan::single(paged(
                template(Method::Get, "/rest/agile/1.0/board/{board_id}/issue", args)?
                    .with_optional_query("jql", args.opt_string("jql"))
                    .with_optional_query("fields", args.opt_csv("fields")),
                args,
            )),
            JiraTool::GetSprintsFromBoard => Plan::single(paged(
                template(Method::Get, "/rest/agile/1.0/board/{board_id}/sprint", args)?
                    .with_optional_query("state", args.opt_string("state")),
                args,
            )),
            JiraTool::GetSprintIssues => Plan::single(paged(
                template(Method::Get, "/rest/agile/1.0/sprint/{sprint_id}/issue", args)?
                    .with_optional_query("fields", args.opt_csv("fields")),
                args,
            )),
            JiraTool::CreateSprint => {
                let board_id = args.u64("board_id")?;
                let mut body = json!({
                    "name": args.str("name")?,
                    "originBoardId": board_id,
                });
                copy_optional(args, &mut body, &[("start_date", "startDate"), ("end_date", "endDate"), ("goal", "goal")]);
                Plan::single(RemoteRequest::new(Method::Post, "/rest/agile/1.0/sprint").with_body(body))
            }
            JiraTool::UpdateSprint => {
                let mut body = json!({});
                copy_optional(
                    args,
                    &mut body,
                    &[
                        ("name", "name"),
                        ("state", "state"),
                        ("start_date", "startDate"),
                        ("end_date", "endDate"),
                        ("goal", "goal"),
                    ],
                );
                if body.as_object().map_or(true, Map::is_empty) {
                    return Err(ArgumentError::new(
                        "At least one of name, state, start_date, end_date, goal is required",
                    ));
                }
                // Partial update is a POST on the Agile API.
                Plan::single(template(Method::Post, "/rest/agile/1.0/sprint/{sprint_id}", args)?.with_body(body))
            }
            JiraTool::AddIssuesToSprint => Plan::single(
                template(Method::Post, "/rest/agile/1.0/sprint/{sprint_id}/issue", args)?
                    .with_body(json!({ "issues": args.string_list("issue_keys")? })),
            ),
            JiraTool::GetCurrentUser => Plan::single(RemoteRequest::new(Method::Get, "/rest/api/2/myself")),
            JiraTool::GetUserProfile => Plan::single(
                RemoteRequest::new(Method::Get, "/rest/api/2/user").with_query("username", args.str("username")?),
            ),
            JiraTool::SearchFields => Plan::Single {
                request: RemoteRequest::new(Method::Get, "/rest/api/2/field"),
                shape: Shape::FieldFilter {
                    keyword: args.opt_string("keyword").unwrap_or_default(),
                    limit: args.opt_u64("limit").unwrap_or(50) as usize,
                },
            },
        };
        Ok(plan)
    }
}

// =============================================================================
// Parameter helpers
// =============================================================================

fn text() -> ParamType {
    ParamType::String
}

fn issue_key() -> ParamDef {
    ParamDef::required("issue_key", ParamType::String, "Jira issue key, e.g. PROJ-123")
}

fn project_key() -> ParamDef {
    ParamDef::required("project_key", ParamType::String, "Jira project key, e.g. PROJ")
}

fn board_id() -> ParamDef {
    ParamDef::required("board_id", ParamType::Int, "Agile board id")
}

fn sprint_id() -> ParamDef {
    ParamDef::required("sprint_id", ParamType::Int, "Sprint id")
}

fn sprint_state() -> ParamType {
    ParamType::Enum(vec!["future", "active", "closed"])
}

fn start_at() -> ParamDef {
    ParamDef::with_default("start_at", ParamType::Int, "Index of the first result (0-based)", json!(0))
}

fn max_results(default: u64) -> ParamDef {
    ParamDef::with_default("max_results", ParamType::Int, "Maximum number of results", json!(default))
}

fn issue_create_params() -> Vec<ParamDef> {
    vec![
        project_key(),
        ParamDef::required("summary", text(), "Issue summary"),
        ParamDef::required("issue_type", text(), "Issue type name, e.g. Task, Bug, Story"),
        ParamDef::optional("description", text(), "Issue description"),
        ParamDef::optional("assignee", text(), "Assignee username"),
        ParamDef::optional("priority", text(), "Priority name, e.g. High"),
        ParamDef::optional("labels", ParamType::StringList, "Labels"),
        ParamDef::optional("components", ParamType::StringList, "Component names"),
        ParamDef::optional("parent_key", text(), "Parent issue key, for subtasks"),
        ParamDef::optional("additional_fields", ParamType::Object, "Extra fields in Jira's REST format, e.g. custom fields"),
    ]
}

fn version_params() -> Vec<ParamDef> {
    let mut params = vec![project_key()];
    params.extend(version_item_params());
    params
}

/// Per-version fields; the project comes from the enclosing call.
fn version_item_params() -> Vec<ParamDef> {
    vec![
        ParamDef::required("name", text(), "Version name"),
        ParamDef::optional("description", text(), "Version description"),
        ParamDef::optional("start_date", text(), "Start date, YYYY-MM-DD"),
        ParamDef::optional("release_date", text(), "Release date, YYYY-MM-DD"),
        ParamDef::optional("released", ParamType::Bool, "Mark as released"),
        ParamDef::optional("archived", ParamType::Bool, "Mark as archived"),
    ]
}

// =============================================================================
// Request helpers
// =============================================================================

fn template(method: Method, template: &str, args: &ToolArgs) -> Result<RemoteRequest, ArgumentError> {
    Ok(RemoteRequest::from_template(method, template, args.as_map())?)
}

/// Pass `start_at` / `max_results` through as Jira's paging parameters.
fn paged(request: RemoteRequest, args: &ToolArgs) -> RemoteRequest {
    request
        .with_optional_query("startAt", args.opt_u64("start_at").map(|n| n.to_string()))
        .with_optional_query("maxResults", args.opt_u64("max_results").map(|n| n.to_string()))
}

fn search_request(jql: &str, args: &ToolArgs) -> RemoteRequest {
    let mut body = json!({
        "jql": jql,
        "startAt": args.opt_u64("start_at").unwrap_or(0),
        "maxResults": args.opt_u64("max_results").unwrap_or(50),
    });
    if let Some(fields) = args.opt_csv("fields") {
        let fields: Vec<&str> = fields.split(',').map(str::trim).filter(|f| !f.is_empty()).collect();
        body["fields"] = json!(fields);
    }
    if let Some(expand) = args.opt_csv("expand") {
        body["expand"] = json!(expand);
    }
    RemoteRequest::new(Method::Post, "/rest/api/2/search").with_body(body)
}

/// Type-check one batch item, naming its position on failure.
fn checked_item(
    field: &str,
    index: usize,
    defs: &[ParamDef],
    item: Map<String, Value>,
) -> Result<ToolArgs, ArgumentError> {
    let problems = check_params(defs, &item);
    if !problems.is_empty() {
        return Err(ArgumentError::new(format!("{}[{}]: {}", field, index, problems.join("; "))));
    }
    Ok(ToolArgs::new(item))
}

fn required_object<'a>(args: &'a ToolArgs, key: &str) -> Result<&'a Value, ArgumentError> {
    args.value(key)
        .filter(|v| v.is_object())
        .ok_or_else(|| ArgumentError::new(format!("Missing required field: {}", key)))
}

/// `{"fields": {...}}` body for issue creation.
fn issue_create_body(item: &ToolArgs) -> Result<Value, ArgumentError> {
    let mut fields = Map::new();
    fields.insert("project".to_string(), json!({ "key": item.str("project_key")? }));
    fields.insert("summary".to_string(), json!(item.str("summary")?));
    fields.insert("issuetype".to_string(), json!({ "name": item.str("issue_type")? }));

    if let Some(description) = item.opt_str("description") {
        fields.insert("description".to_string(), json!(description));
    }
    if let Some(assignee) = item.opt_str("assignee") {
        fields.insert("assignee".to_string(), json!({ "name": assignee }));
    }
    if let Some(priority) = item.opt_str("priority") {
        fields.insert("priority".to_string(), json!({ "name": priority }));
    }
    if let Some(labels) = item.value("labels").and_then(Value::as_array) {
        fields.insert("labels".to_string(), Value::Array(labels.clone()));
    }
    if let Some(components) = item.value("components").and_then(Value::as_array) {
        let components: Vec<Value> = components
            .iter()
            .filter_map(Value::as_str)
            .map(|name| json!({ "name": name }))
            .collect();
        fields.insert("components".to_string(), Value::Array(components));
    }
    if let Some(parent) = item.opt_str("parent_key") {
        fields.insert("parent".to_string(), json!({ "key": parent }));
    }
    if let Some(extra) = item.value("additional_fields").and_then(Value::as_object) {
        for (key, value) in extra {
            fields.insert(key.clone(), value.clone());
        }
    }
    Ok(json!({ "fields": fields }))
}

/// Body for `POST /rest/api/2/version`.
fn version_body(project_key: &str, item: &ToolArgs) -> Result<Value, ArgumentError> {
    let mut body = json!({
        "project": project_key,
        "name": item.str("name")?,
    });
    copy_optional(
        item,
        &mut body,
        &[
            ("description", "description"),
            ("start_date", "startDate"),
            ("release_date", "releaseDate"),
            ("released", "released"),
            ("archived", "archived"),
        ],
    );
    Ok(body)
}

/// Copy present arguments into `body` under their Jira names.
fn copy_optional(args: &ToolArgs, body: &mut Value, mapping: &[(&str, &str)]) {
    for (arg, jira_name) in mapping {
        if let Some(value) = args.value(arg) {
            if value.as_str().map_or(true, |s| !s.trim().is_empty()) {
                body[*jira_name] = value.clone();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashSet;

    fn args(value: Value) -> ToolArgs {
        ToolArgs::new(value.as_object().cloned().unwrap())
    }

    fn single(plan: Plan) -> RemoteRequest {
        match plan {
            Plan::Single { request, .. } => request,
            other => panic!("expected single plan, got {:?}", other),
        }
    }

    fn query_value<'a>(req: &'a RemoteRequest, key: &str) -> Option<&'a str> {
        req.query()
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    #[test]
    fn test_names_are_unique() {
        let names: HashSet<&str> = JiraTool::ALL.iter().map(|t| t.name()).collect();
        assert_eq!(names.len(), JiraTool::ALL.len());
        assert!(names.iter().all(|n| n.starts_with("jira_")));
    }

    #[test]
    fn test_definitions_reference_their_tool() {
        for tool in JiraTool::ALL {
            let def = tool.definition();
            assert_eq!(def.tool, tool);
            assert!(!def.description.is_empty(), "{} has no description", tool.name());
        }
    }

    #[test]
    fn test_get_issue_request() {
        let req = single(
            JiraTool::GetIssue
                .plan(&args(json!({"issue_key": "PROJ-1", "fields": "summary,status"})))
                .unwrap(),
        );
        assert_eq!(req.to_string(), "GET /rest/api/2/issue/PROJ-1");
        assert_eq!(query_value(&req, "fields"), Some("summary,status"));
        assert_eq!(query_value(&req, "expand"), None);
    }

    #[test]
    fn test_search_body_passes_paging_through() {
        let req = single(
            JiraTool::Search
                .plan(&args(json!({
                    "jql": "project = PROJ",
                    "fields": "summary, status",
                    "start_at": 100,
                    "max_results": 25
                })))
                .unwrap(),
        );
        assert_eq!(req.to_string(), "POST /rest/api/2/search");
        assert_eq!(
            req.body().unwrap(),
            &json!({
                "jql": "project = PROJ",
                "startAt": 100,
                "maxResults": 25,
                "fields": ["summary", "status"]
            })
        );
    }

    #[test]
    fn test_project_issues_quotes_key() {
        let req = single(
            JiraTool::GetProjectIssues
                .plan(&args(json!({"project_key": "OPS"})))
                .unwrap(),
        );
        assert_eq!(
            req.body().unwrap()["jql"],
            "project = \"OPS\" ORDER BY created DESC"
        );
    }

    #[test]
    fn test_create_issue_body() {
        let req = single(
            JiraTool::CreateIssue
                .plan(&args(json!({
                    "project_key": "PROJ",
                    "summary": "Broken login",
                    "issue_type": "Bug",
                    "priority": "High",
                    "labels": ["auth"],
                    "components": ["Web"],
                    "additional_fields": {"customfield_10010": 3}
                })))
                .unwrap(),
        );
        assert_eq!(
            req.body().unwrap(),
            &json!({
                "fields": {
                    "project": {"key": "PROJ"},
                    "summary": "Broken login",
                    "issuetype": {"name": "Bug"},
                    "priority": {"name": "High"},
                    "labels": ["auth"],
                    "components": [{"name": "Web"}],
                    "customfield_10010": 3
                }
            })
        );
    }

    #[test]
    fn test_batch_create_issues_items_in_order() {
        let plan = JiraTool::BatchCreateIssues
            .plan(&args(json!({
                "issues": [
                    {"project_key": "P", "summary": "one", "issue_type": "Task"},
                    {"project_key": "P", "summary": "two", "issue_type": "Task"},
                    {"project_key": "P", "summary": "three", "issue_type": "Task"}
                ]
            })))
            .unwrap();
        match plan {
            Plan::Batch(items) => {
                let keys: Vec<&str> = items.iter().map(|i| i.key.as_str()).collect();
                assert_eq!(keys, vec!["one", "two", "three"]);
                assert!(items.iter().all(|i| i.request.to_string() == "POST /rest/api/2/issue"));
            }
            other => panic!("expected batch, got {:?}", other),
        }
    }

    #[test]
    fn test_batch_create_issues_reports_bad_item_index() {
        let err = JiraTool::BatchCreateIssues
            .plan(&args(json!({
                "issues": [
                    {"project_key": "P", "summary": "one", "issue_type": "Task"},
                    {"project_key": "P", "issue_type": "Task"}
                ]
            })))
            .unwrap_err();
        assert_eq!(err.0, "issues[1]: Missing required parameter: summary");
    }

    #[test]
    fn test_batch_create_issues_type_checks_optional_fields() {
        let err = JiraTool::BatchCreateIssues
            .plan(&args(json!({
                "issues": [
                    {"project_key": "P", "summary": "one", "issue_type": "Task"},
                    {"project_key": "P", "summary": "two", "issue_type": "Task", "labels": "x"}
                ]
            })))
            .unwrap_err();
        assert!(err.0.starts_with("issues[1]: Parameter 'labels'"), "{}", err.0);

        let err = JiraTool::BatchCreateIssues
            .plan(&args(json!({
                "issues": [{"project_key": "P", "summary": "one", "issue_type": "Task", "components": "Core"}]
            })))
            .unwrap_err();
        assert!(err.0.starts_with("issues[0]: Parameter 'components'"), "{}", err.0);
    }

    #[test]
    fn test_batch_create_versions_type_checks_items() {
        let err = JiraTool::BatchCreateVersions
            .plan(&args(json!({
                "project_key": "PROJ",
                "versions": [{"name": "1.0"}, {"name": "1.1", "released": "yes"}]
            })))
            .unwrap_err();
        assert!(err.0.starts_with("versions[1]: Parameter 'released'"), "{}", err.0);
    }

    #[test]
    fn test_batch_changelogs_rejects_blank_key() {
        let err = JiraTool::BatchGetChangelogs
            .plan(&args(json!({"issue_keys": ["A-1", " ", "A-2"]})))
            .unwrap_err();
        assert_eq!(err.0, "issue_keys[1] must be non-empty");
    }

    #[test]
    fn test_add_issues_to_sprint_rejects_blank_key() {
        let err = JiraTool::AddIssuesToSprint
            .plan(&args(json!({"sprint_id": 3, "issue_keys": ["A-1", ""]})))
            .unwrap_err();
        assert_eq!(err.0, "issue_keys[1] must be non-empty");
    }

    #[test]
    fn test_batch_changelogs_one_item_per_key() {
        let plan = JiraTool::BatchGetChangelogs
            .plan(&args(json!({"issue_keys": ["A-1", "A-2"]})))
            .unwrap();
        let Plan::Batch(items) = plan else {
            panic!("expected batch");
        };
        assert_eq!(items.len(), 2);
        assert_eq!(items[1].key, "A-2");
        assert_eq!(items[1].request.path(), "/rest/api/2/issue/A-2");
        assert_eq!(query_value(&items[1].request, "expand"), Some("changelog"));
    }

    #[test]
    fn test_batch_create_versions_bodies() {
        let plan = JiraTool::BatchCreateVersions
            .plan(&args(json!({
                "project_key": "PROJ",
                "versions": [{"name": "1.0", "released": true}, {"name": "1.1", "release_date": "2024-06-01"}]
            })))
            .unwrap();
        let Plan::Batch(items) = plan else {
            panic!("expected batch");
        };
        assert_eq!(
            items[0].request.body().unwrap(),
            &json!({"project": "PROJ", "name": "1.0", "released": true})
        );
        assert_eq!(
            items[1].request.body().unwrap(),
            &json!({"project": "PROJ", "name": "1.1", "releaseDate": "2024-06-01"})
        );
    }

    #[test]
    fn test_transition_plan() {
        let plan = JiraTool::TransitionIssue
            .plan(&args(json!({"issue_key": "A-1", "transition": "Done", "comment": "ok"})))
            .unwrap();
        match plan {
            Plan::Transition(t) => {
                assert_eq!(t.issue_key, "A-1");
                assert_eq!(t.transition, "Done");
                assert_eq!(t.comment.as_deref(), Some("ok"));
            }
            other => panic!("expected transition, got {:?}", other),
        }
    }

    #[test]
    fn test_delete_issue_query() {
        let req = single(
            JiraTool::DeleteIssue
                .plan(&args(json!({"issue_key": "A-1", "delete_subtasks": true})))
                .unwrap(),
        );
        assert_eq!(req.method(), Method::Delete);
        assert_eq!(query_value(&req, "deleteSubtasks"), Some("true"));
    }

    #[test]
    fn test_assign_issue_unassigns_without_assignee() {
        let req = single(JiraTool::AssignIssue.plan(&args(json!({"issue_key": "A-1"}))).unwrap());
        assert_eq!(req.body().unwrap(), &json!({"name": null}));
    }

    #[test]
    fn test_add_worklog_defaults_started() {
        let req = single(
            JiraTool::AddWorklog
                .plan(&args(json!({"issue_key": "A-1", "time_spent": "1h"})))
                .unwrap(),
        );
        let started = req.body().unwrap()["started"].as_str().unwrap().to_string();
        assert!(
            chrono::DateTime::parse_from_str(&started, JIRA_TIMESTAMP_FORMAT).is_ok(),
            "unexpected timestamp {}",
            started
        );
    }

    #[test]
    fn test_board_sprints_request() {
        let req = single(
            JiraTool::GetSprintsFromBoard
                .plan(&args(json!({"board_id": 7, "state": "active", "start_at": 0, "max_results": 10})))
                .unwrap(),
        );
        assert_eq!(req.path(), "/rest/agile/1.0/board/7/sprint");
        assert_eq!(query_value(&req, "state"), Some("active"));
        assert_eq!(query_value(&req, "maxResults"), Some("10"));
    }

    #[test]
    fn test_create_sprint_body() {
        let req = single(
            JiraTool::CreateSprint
                .plan(&args(json!({"board_id": 7, "name": "Sprint 1", "goal": "ship"})))
                .unwrap(),
        );
        assert_eq!(
            req.body().unwrap(),
            &json!({"name": "Sprint 1", "originBoardId": 7, "goal": "ship"})
        );
    }

    #[test]
    fn test_create_sprint_rejects_negative_board() {
        let err = JiraTool::CreateSprint
            .plan(&args(json!({"board_id": -7, "name": "Sprint 1"})))
            .unwrap_err();
        assert_eq!(err.0, "board_id must be a non-negative integer");
    }

    #[test]
    fn test_update_sprint_requires_a_field() {
        let err = JiraTool::UpdateSprint
            .plan(&args(json!({"sprint_id": 3})))
            .unwrap_err();
        assert!(err.0.contains("At least one of"));

        let req = single(
            JiraTool::UpdateSprint
                .plan(&args(json!({"sprint_id": 3, "state": "closed"})))
                .unwrap(),
        );
        assert_eq!(req.to_string(), "POST /rest/agile/1.0/sprint/3");
        assert_eq!(req.body().unwrap(), &json!({"state": "closed"}));
    }

    #[test]
    fn test_search_fields_shape() {
        let plan = JiraTool::SearchFields
            .plan(&args(json!({"keyword": "story", "limit": 5})))
            .unwrap();
        match plan {
            Plan::Single { request, shape } => {
                assert_eq!(request.path(), "/rest/api/2/field");
                assert_eq!(
                    shape,
                    Shape::FieldFilter {
                        keyword: "story".to_string(),
                        limit: 5
                    }
                );
            }
            other => panic!("expected single, got {:?}", other),
        }
    }

    #[test]
    fn test_user_profile_query() {
        let req = single(
            JiraTool::GetUserProfile
                .plan(&args(json!({"username": "jdoe"})))
                .unwrap(),
        );
        assert_eq!(query_value(&req, "username"), Some("jdoe"));
    }
}
